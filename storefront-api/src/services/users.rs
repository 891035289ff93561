use storefront_core::{
    CreateUserRequest, EntityType, UpdateUserRequest, User, UserFilter, UserId,
};
use storefront_storage::{CacheRead, FilterSet, MutationKind};
use tracing::info;

use super::CatalogService;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validate;

impl CatalogService {
    pub async fn get_user(&self, id: UserId) -> ApiResult<CacheRead<User>> {
        let repo = self.repository();
        self.cache
            .reader()
            .read_single(EntityType::User, &id.to_string(), || async move {
                repo.user_get(id).await.map_err(ApiError::from)
            })
            .await?
            .ok_or_else(|| ApiError::entity_not_found("User", id))
    }

    pub async fn list_users(&self, filter: &UserFilter) -> ApiResult<CacheRead<Vec<User>>> {
        let selector = FilterSet::new().text("role", filter.role.map(|r| r.as_str()));
        let repo = self.repository();
        self.cache
            .reader()
            .read_collection(EntityType::User, &selector, || async move {
                repo.user_list(filter).await.map_err(ApiError::from)
            })
            .await
    }

    pub async fn create_user(&self, req: &CreateUserRequest) -> ApiResult<User> {
        req.validate()?;
        let user = self.repository().user_insert(req).await?;
        self.committed(EntityType::User, user.id, MutationKind::Created)
            .await;
        info!(user_id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    pub async fn update_user(&self, id: UserId, req: &UpdateUserRequest) -> ApiResult<User> {
        req.validate()?;
        let user = self.repository().user_update(id, req).await?;
        self.committed(EntityType::User, id, MutationKind::Updated)
            .await;
        Ok(user)
    }

    pub async fn delete_user(&self, id: UserId) -> ApiResult<User> {
        let user = self.repository().user_delete(id).await?;
        self.committed(EntityType::User, id, MutationKind::Deleted)
            .await;
        info!(user_id = %id, "User deleted");
        Ok(user)
    }
}
