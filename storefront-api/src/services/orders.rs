//! Order operations.
//!
//! Buyers see their own orders; admins see everyone's. Placing an order
//! takes stock from each ordered product, so the products are invalidated
//! along with the order collection.

use std::collections::BTreeSet;

use storefront_core::{
    AccessError, Actor, CreateOrderRequest, EntityType, Order, OrderFilter, OrderId, OrderStatus,
};
use storefront_storage::{CacheRead, FilterSet, MutationKind};
use tracing::info;

use super::CatalogService;
use crate::error::{ApiError, ApiResult};
use crate::validation::Validate;

impl CatalogService {
    /// One order, visible to its buyer and to admins.
    pub async fn get_order(&self, actor: &Actor, id: OrderId) -> ApiResult<CacheRead<Order>> {
        let repo = self.repository();
        let read = self
            .cache
            .reader()
            .read_single(EntityType::Order, &id.to_string(), || async move {
                repo.order_get(id).await.map_err(ApiError::from)
            })
            .await?
            .ok_or_else(|| ApiError::entity_not_found("Order", id))?;

        // The buyer of an order never changes, so a cached copy is as good
        // as the origin for this check.
        if !actor.is_admin() && read.value().user_id != actor.user_id {
            return Err(AccessError::NotOwner {
                entity_type: EntityType::Order,
                id: id.to_string(),
            }
            .into());
        }
        Ok(read)
    }

    /// Orders matching `filter`. Non-admins are always scoped to their own
    /// orders and may not ask for anyone else's.
    pub async fn list_orders(
        &self,
        actor: &Actor,
        filter: &OrderFilter,
    ) -> ApiResult<CacheRead<Vec<Order>>> {
        let mut filter = filter.clone();
        if !actor.is_admin() {
            match filter.user_id {
                Some(user_id) if user_id != actor.user_id => {
                    return Err(ApiError::forbidden("Orders of other users are not visible"));
                }
                _ => filter.user_id = Some(actor.user_id),
            }
        }

        let selector = FilterSet::new()
            .display("userId", filter.user_id)
            .text("status", filter.status.map(|s| s.as_str()));
        let repo = self.repository();
        let filter = &filter;
        self.cache
            .reader()
            .read_collection(EntityType::Order, &selector, || async move {
                repo.order_list(filter).await.map_err(ApiError::from)
            })
            .await
    }

    pub async fn create_order(&self, actor: &Actor, req: &CreateOrderRequest) -> ApiResult<Order> {
        req.validate()?;
        let order = self.repository().order_insert(actor.user_id, req).await?;

        self.committed(EntityType::Order, order.id, MutationKind::Created)
            .await;
        let touched: BTreeSet<_> = order.items.iter().map(|item| item.product_id).collect();
        for product_id in &touched {
            self.committed(EntityType::Product, product_id, MutationKind::Updated)
                .await;
        }

        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            products = touched.len(),
            total = order.total,
            "Order placed"
        );
        Ok(order)
    }

    /// Move an order to `status`. Admin only.
    pub async fn update_order_status(
        &self,
        actor: &Actor,
        id: OrderId,
        status: OrderStatus,
    ) -> ApiResult<Order> {
        if !actor.is_admin() {
            return Err(ApiError::forbidden("Only admins may change order status"));
        }
        let order = self.repository().order_update_status(id, status).await?;
        self.committed(EntityType::Order, id, MutationKind::Updated)
            .await;
        info!(order_id = %id, status = status.as_str(), "Order status changed");
        Ok(order)
    }
}
