//! Storefront Core - Entity Types
//!
//! Pure data structures shared by every other crate: identifiers, catalog
//! entities, list filters, request payloads and the error taxonomy.

pub mod entities;
pub mod error;
pub mod filter;
pub mod identity;
pub mod requests;

pub use entities::{Category, Order, OrderItem, OrderStatus, Product, Review, Role, User};
pub use error::{AccessError, StorageError, StorefrontError, StorefrontResult, ValidationError};
pub use filter::{empty_as_none, OrderFilter, ProductFilter, ReviewFilter, UserFilter};
pub use identity::{
    CategoryId, EntityIdType, EntityType, OrderId, ProductId, ReviewId, Timestamp, UserId,
};
pub use requests::{
    Actor, CreateCategoryRequest, CreateOrderRequest, CreateProductRequest, CreateReviewRequest,
    CreateUserRequest, OrderLineRequest, UpdateCategoryRequest, UpdateOrderStatusRequest, UpdateProductRequest,
    UpdateReviewRequest, UpdateUserRequest,
};
