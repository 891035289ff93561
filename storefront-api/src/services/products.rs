//! Product operations.

use storefront_core::{
    CreateProductRequest, EntityType, Product, ProductFilter, ProductId, UpdateProductRequest,
};
use storefront_storage::{CacheRead, FilterSet, MutationKind};
use tracing::info;

use super::CatalogService;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validate;

/// Cache selector for a product listing. Field names match the query
/// string so a key reads like the request that produced it.
pub(crate) fn product_selector(filter: &ProductFilter) -> FilterSet {
    FilterSet::new()
        .display("categoryId", filter.category_id)
        .text("search", filter.search.clone())
        .decimal("maxPrice", filter.max_price)
        .decimal("minRating", filter.min_rating)
        .unsigned("take", filter.take)
        .unsigned("skip", filter.skip)
}

impl CatalogService {
    pub async fn get_product(&self, id: ProductId) -> ApiResult<CacheRead<Product>> {
        let repo = self.repository();
        self.cache
            .reader()
            .read_single(EntityType::Product, &id.to_string(), || async move {
                repo.product_get(id).await.map_err(ApiError::from)
            })
            .await?
            .ok_or_else(|| ApiError::entity_not_found("Product", id))
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> ApiResult<CacheRead<Vec<Product>>> {
        let repo = self.repository();
        self.cache
            .reader()
            .read_collection(EntityType::Product, &product_selector(filter), || async move {
                repo.product_list(filter).await.map_err(ApiError::from)
            })
            .await
    }

    pub async fn create_product(&self, req: &CreateProductRequest) -> ApiResult<Product> {
        req.validate()?;
        let product = self.repository().product_insert(req).await?;
        self.committed(EntityType::Product, product.id, MutationKind::Created)
            .await;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: ProductId,
        req: &UpdateProductRequest,
    ) -> ApiResult<Product> {
        req.validate()?;
        let product = self.repository().product_update(id, req).await?;
        self.committed(EntityType::Product, id, MutationKind::Updated)
            .await;
        Ok(product)
    }

    pub async fn delete_product(&self, id: ProductId) -> ApiResult<Product> {
        let product = self.repository().product_delete(id).await?;
        self.committed(EntityType::Product, id, MutationKind::Deleted)
            .await;
        info!(product_id = %id, "Product deleted");
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storefront_core::EntityIdType;
    use storefront_storage::{CacheLayer, CachePolicy, InMemoryCatalog};
    use storefront_test_utils::{fixtures, seed_catalog};

    use super::*;
    use crate::error::ErrorCode;

    fn service() -> (CatalogService, Arc<InMemoryCatalog>) {
        let origin = Arc::new(InMemoryCatalog::new());
        let cache = CacheLayer::in_memory(CachePolicy::default());
        (CatalogService::new(origin.clone(), cache), origin)
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let (service, origin) = service();
        let seeded = seed_catalog(origin.as_ref()).await.unwrap();
        let lamp = seeded.product("Lamp").id;

        let before = origin.origin_reads();
        let first = service.get_product(lamp).await.unwrap();
        let second = service.get_product(lamp).await.unwrap();

        assert!(first.was_cache_miss());
        assert!(second.was_cache_hit());
        assert_eq!(first.value(), second.value());
        assert_eq!(origin.origin_reads() - before, 1);
    }

    #[tokio::test]
    async fn test_update_purges_single_and_lists() {
        let (service, origin) = service();
        let seeded = seed_catalog(origin.as_ref()).await.unwrap();
        let lamp = seeded.product("Lamp").id;
        let in_lighting = ProductFilter {
            category_id: Some(seeded.lighting.id),
            ..Default::default()
        };

        service.get_product(lamp).await.unwrap();
        service.list_products(&in_lighting).await.unwrap();

        let update = UpdateProductRequest {
            price: Some(20.0),
            ..Default::default()
        };
        service.update_product(lamp, &update).await.unwrap();

        let single = service.get_product(lamp).await.unwrap();
        assert!(single.was_cache_miss());
        assert_eq!(single.value().price, 20.0);

        let list = service.list_products(&in_lighting).await.unwrap();
        assert!(list.was_cache_miss());
        assert!(list.value().iter().any(|p| p.id == lamp && p.price == 20.0));
    }

    #[tokio::test]
    async fn test_create_purges_lists_of_other_categories() {
        let (service, origin) = service();
        let seeded = seed_catalog(origin.as_ref()).await.unwrap();
        let in_kitchen = ProductFilter {
            category_id: Some(seeded.kitchen.id),
            ..Default::default()
        };
        assert_eq!(service.list_products(&in_kitchen).await.unwrap().value().len(), 1);

        // A lighting product still empties the kitchen listing.
        let req = fixtures::product_request("Bulb", 2.0, seeded.lighting.id);
        service.create_product(&req).await.unwrap();

        let list = service.list_products(&in_kitchen).await.unwrap();
        assert!(list.was_cache_miss());
        assert_eq!(list.value().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found_and_not_cached() {
        let (service, origin) = service();
        let id = ProductId::now_v7();

        for _ in 0..2 {
            let err = service.get_product(id).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::EntityNotFound);
        }
        assert_eq!(origin.origin_reads(), 2);
    }

    #[tokio::test]
    async fn test_invalid_create_never_reaches_origin() {
        let (service, origin) = service();
        let seeded = seed_catalog(origin.as_ref()).await.unwrap();
        let mut req = fixtures::product_request("Bad", -1.0, seeded.kitchen.id);
        req.name = String::new();

        assert!(service.create_product(&req).await.is_err());
        let all = service.list_products(&ProductFilter::default()).await.unwrap();
        assert_eq!(all.value().len(), 3);
    }

    #[test]
    fn test_selector_omits_absent_fields() {
        let selector = product_selector(&ProductFilter {
            search: Some("lamp".to_string()),
            ..Default::default()
        });
        assert_eq!(selector.len(), 1);
    }
}
