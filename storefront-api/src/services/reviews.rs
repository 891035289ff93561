//! Review operations.
//!
//! Reviews are listed per product only. Update and delete are reserved to
//! the review's author; the ownership check reads the origin, never the
//! cache, so a stale entry cannot grant access.

use storefront_core::{
    AccessError, Actor, CreateReviewRequest, EntityType, Review, ReviewFilter, ReviewId,
    UpdateReviewRequest,
};
use storefront_storage::{CacheRead, FilterSet, MutationKind};
use tracing::{info, warn};

use super::CatalogService;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validate;

impl CatalogService {
    pub async fn get_review(&self, id: ReviewId) -> ApiResult<CacheRead<Review>> {
        let repo = self.repository();
        self.cache
            .reader()
            .read_single(EntityType::Review, &id.to_string(), || async move {
                repo.review_get(id).await.map_err(ApiError::from)
            })
            .await?
            .ok_or_else(|| ApiError::entity_not_found("Review", id))
    }

    /// Reviews of one product. `productId` is required.
    pub async fn list_reviews(&self, filter: &ReviewFilter) -> ApiResult<CacheRead<Vec<Review>>> {
        let product_id = filter
            .product_id
            .ok_or_else(|| ApiError::missing_field("productId"))?;
        let selector = FilterSet::new().display("productId", Some(product_id));

        let repo = self.repository();
        self.cache
            .reader()
            .read_collection(EntityType::Review, &selector, || async move {
                repo.review_list(filter).await.map_err(ApiError::from)
            })
            .await
    }

    pub async fn create_review(&self, actor: &Actor, req: &CreateReviewRequest) -> ApiResult<Review> {
        req.validate()?;
        let review = self.repository().review_insert(actor.user_id, req).await?;
        self.committed(EntityType::Review, review.id, MutationKind::Created)
            .await;
        info!(review_id = %review.id, product_id = %review.product_id, "Review created");
        Ok(review)
    }

    pub async fn update_review(
        &self,
        actor: &Actor,
        id: ReviewId,
        req: &UpdateReviewRequest,
    ) -> ApiResult<Review> {
        req.validate()?;
        self.authorize_review(actor, id).await?;
        let review = self.repository().review_update(id, req).await?;
        self.committed(EntityType::Review, id, MutationKind::Updated)
            .await;
        Ok(review)
    }

    pub async fn delete_review(&self, actor: &Actor, id: ReviewId) -> ApiResult<Review> {
        self.authorize_review(actor, id).await?;
        let review = self.repository().review_delete(id).await?;
        self.committed(EntityType::Review, id, MutationKind::Deleted)
            .await;
        info!(review_id = %id, "Review deleted");
        Ok(review)
    }

    async fn authorize_review(&self, actor: &Actor, id: ReviewId) -> ApiResult<()> {
        let review = self
            .repository()
            .review_get(id)
            .await?
            .ok_or_else(|| ApiError::entity_not_found("Review", id))?;

        if review.user_id != actor.user_id {
            warn!(review_id = %id, user_id = %actor.user_id, "Review change by non-author refused");
            return Err(AccessError::NotOwner {
                entity_type: EntityType::Review,
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
