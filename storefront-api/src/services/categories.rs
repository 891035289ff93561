use storefront_core::{
    Category, CategoryId, CreateCategoryRequest, EntityType, UpdateCategoryRequest,
};
use storefront_storage::{CacheRead, FilterSet, MutationKind};
use tracing::info;

use super::CatalogService;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validate;

impl CatalogService {
    pub async fn get_category(&self, id: CategoryId) -> ApiResult<CacheRead<Category>> {
        let repo = self.repository();
        self.cache
            .reader()
            .read_single(EntityType::Category, &id.to_string(), || async move {
                repo.category_get(id).await.map_err(ApiError::from)
            })
            .await?
            .ok_or_else(|| ApiError::entity_not_found("Category", id))
    }

    /// Categories take no filters; there is one listing.
    pub async fn list_categories(&self) -> ApiResult<CacheRead<Vec<Category>>> {
        let repo = self.repository();
        self.cache
            .reader()
            .read_collection(EntityType::Category, &FilterSet::new(), || async move {
                repo.category_list().await.map_err(ApiError::from)
            })
            .await
    }

    pub async fn create_category(&self, req: &CreateCategoryRequest) -> ApiResult<Category> {
        req.validate()?;
        let category = self.repository().category_insert(req).await?;
        self.committed(EntityType::Category, category.id, MutationKind::Created)
            .await;
        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: CategoryId,
        req: &UpdateCategoryRequest,
    ) -> ApiResult<Category> {
        req.validate()?;
        let category = self.repository().category_update(id, req).await?;
        self.committed(EntityType::Category, id, MutationKind::Updated)
            .await;
        Ok(category)
    }

    /// Fails while products still reference the category.
    pub async fn delete_category(&self, id: CategoryId) -> ApiResult<Category> {
        let category = self.repository().category_delete(id).await?;
        self.committed(EntityType::Category, id, MutationKind::Deleted)
            .await;
        info!(category_id = %id, "Category deleted");
        Ok(category)
    }
}
