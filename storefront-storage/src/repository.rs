//! Origin store trait.
//!
//! The cache layer never talks to the origin directly; the service layer
//! wraps these calls in loaders. Implementations are the system of record
//! and must be thread-safe.

use async_trait::async_trait;
use storefront_core::{
    Category, CategoryId, CreateCategoryRequest, CreateOrderRequest, CreateProductRequest,
    CreateReviewRequest, CreateUserRequest, Order, OrderFilter, OrderId, OrderStatus, Product,
    ProductFilter, ProductId, Review, ReviewFilter, ReviewId, StorefrontResult,
    UpdateCategoryRequest, UpdateProductRequest, UpdateReviewRequest, UpdateUserRequest, User,
    UserFilter, UserId,
};

/// Async origin store for catalog entities.
///
/// `*_get` and `*_list` are the loaders behind cached reads. Mutations
/// return the entity as committed; `*_delete` returns the removed entity.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    // ========================================================================
    // PRODUCT OPERATIONS
    // ========================================================================

    async fn product_get(&self, id: ProductId) -> StorefrontResult<Option<Product>>;

    /// Products matching `filter`, oldest first, windowed by skip/take.
    async fn product_list(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>>;

    /// Insert a product. Fails if the category does not exist.
    async fn product_insert(&self, req: &CreateProductRequest) -> StorefrontResult<Product>;

    async fn product_update(
        &self,
        id: ProductId,
        req: &UpdateProductRequest,
    ) -> StorefrontResult<Product>;

    async fn product_delete(&self, id: ProductId) -> StorefrontResult<Product>;

    // ========================================================================
    // CATEGORY OPERATIONS
    // ========================================================================

    async fn category_get(&self, id: CategoryId) -> StorefrontResult<Option<Category>>;

    async fn category_list(&self) -> StorefrontResult<Vec<Category>>;

    async fn category_insert(&self, req: &CreateCategoryRequest) -> StorefrontResult<Category>;

    async fn category_update(
        &self,
        id: CategoryId,
        req: &UpdateCategoryRequest,
    ) -> StorefrontResult<Category>;

    async fn category_delete(&self, id: CategoryId) -> StorefrontResult<Category>;

    // ========================================================================
    // REVIEW OPERATIONS
    // ========================================================================

    async fn review_get(&self, id: ReviewId) -> StorefrontResult<Option<Review>>;

    async fn review_list(&self, filter: &ReviewFilter) -> StorefrontResult<Vec<Review>>;

    /// Insert a review authored by `author`. Fails if the product does not
    /// exist.
    async fn review_insert(
        &self,
        author: UserId,
        req: &CreateReviewRequest,
    ) -> StorefrontResult<Review>;

    async fn review_update(
        &self,
        id: ReviewId,
        req: &UpdateReviewRequest,
    ) -> StorefrontResult<Review>;

    async fn review_delete(&self, id: ReviewId) -> StorefrontResult<Review>;

    // ========================================================================
    // USER OPERATIONS
    // ========================================================================

    async fn user_get(&self, id: UserId) -> StorefrontResult<Option<User>>;

    async fn user_list(&self, filter: &UserFilter) -> StorefrontResult<Vec<User>>;

    /// Insert a user. Emails are unique.
    async fn user_insert(&self, req: &CreateUserRequest) -> StorefrontResult<User>;

    async fn user_update(&self, id: UserId, req: &UpdateUserRequest) -> StorefrontResult<User>;

    async fn user_delete(&self, id: UserId) -> StorefrontResult<User>;

    // ========================================================================
    // ORDER OPERATIONS
    // ========================================================================

    async fn order_get(&self, id: OrderId) -> StorefrontResult<Option<Order>>;

    async fn order_list(&self, filter: &OrderFilter) -> StorefrontResult<Vec<Order>>;

    /// Place an order for `buyer`, pricing lines from the catalog and
    /// taking the quantities out of stock in the same commit.
    async fn order_insert(&self, buyer: UserId, req: &CreateOrderRequest)
        -> StorefrontResult<Order>;

    async fn order_update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> StorefrontResult<Order>;
}
