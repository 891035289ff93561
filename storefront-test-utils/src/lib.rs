//! Storefront Test Utilities
//!
//! Shared test infrastructure for the storefront workspace:
//! - Proptest generators for identifiers, filters and requests
//! - Fixtures that seed an [`InMemoryCatalog`]
//! - A loader that counts how often the origin was reached

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

// Re-export the types tests reach for most often.
pub use storefront_core::{
    Actor, Category, CategoryId, CreateCategoryRequest, CreateOrderRequest, CreateProductRequest,
    CreateReviewRequest, CreateUserRequest, EntityIdType, EntityType, Order, OrderId,
    OrderLineRequest, OrderStatus, Product, ProductFilter, ProductId, Review, ReviewId, Role,
    StorefrontResult, User, UserId,
};
pub use storefront_storage::{CacheError, CatalogRepository, InMemoryCatalog};

// ============================================================================
// COUNTING LOADER
// ============================================================================

/// Origin stand-in that records every call.
///
/// ```ignore
/// let loader = CountingLoader::new();
/// cache.read_single(EntityType::Product, "p1", || loader.load(Some(42))).await?;
/// assert_eq!(loader.calls(), 1);
/// ```
#[derive(Debug, Default)]
pub struct CountingLoader {
    calls: AtomicUsize,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a call and resolve to `value`.
    pub fn load<T>(&self, value: T) -> impl Future<Output = Result<T, CacheError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for storefront types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_product_id() -> impl Strategy<Value = ProductId> {
        arb_uuid().prop_map(ProductId::new)
    }

    pub fn arb_category_id() -> impl Strategy<Value = CategoryId> {
        arb_uuid().prop_map(CategoryId::new)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    pub fn arb_entity_type() -> impl Strategy<Value = EntityType> {
        prop::sample::select(EntityType::ALL.to_vec())
    }

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::Seller), Just(Role::Buyer)]
    }

    /// Prices with at most two decimals, as a storefront would list them.
    pub fn arb_price() -> impl Strategy<Value = f64> {
        (1u32..100_000).prop_map(|cents| f64::from(cents) / 100.0)
    }

    /// Search text with stray whitespace and mixed case.
    pub fn arb_search_text() -> impl Strategy<Value = String> {
        ("[ ]{0,2}", "[a-zA-Z]{1,8}", "[ ]{0,2}")
            .prop_map(|(lead, word, trail)| format!("{}{}{}", lead, word, trail))
    }

    pub fn arb_product_filter() -> impl Strategy<Value = ProductFilter> {
        (
            prop::option::of(arb_category_id()),
            prop::option::of(arb_search_text()),
            prop::option::of(arb_price()),
            prop::option::of(0u32..=5),
            prop::option::of(1u32..50),
            prop::option::of(0u32..50),
        )
            .prop_map(|(category_id, search, max_price, min_rating, take, skip)| {
                ProductFilter {
                    category_id,
                    search,
                    max_price,
                    min_rating: min_rating.map(f64::from),
                    take,
                    skip,
                }
            })
    }

    pub fn arb_create_product_request(
        category_id: CategoryId,
    ) -> impl Strategy<Value = CreateProductRequest> {
        ("[A-Z][a-z]{2,12}", "[a-z ]{5,40}", arb_price(), 0u32..=5, 0u32..500).prop_map(
            move |(name, description, price, rating, stock)| CreateProductRequest {
                name,
                description,
                image: "https://img.example/product.png".to_string(),
                price,
                rating: f64::from(rating),
                stock,
                category_id,
            },
        )
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made requests and a seeded catalog.

    use super::*;

    pub fn category_request(name: &str) -> CreateCategoryRequest {
        CreateCategoryRequest {
            name: name.to_string(),
            description: format!("{} and related items", name),
            image: "https://img.example/category.png".to_string(),
        }
    }

    pub fn product_request(name: &str, price: f64, category_id: CategoryId) -> CreateProductRequest {
        CreateProductRequest {
            name: name.to_string(),
            description: format!("A fine {}", name.to_lowercase()),
            image: "https://img.example/product.png".to_string(),
            price,
            rating: 4.0,
            stock: 10,
            category_id,
        }
    }

    pub fn user_request(name: &str, role: Role) -> CreateUserRequest {
        CreateUserRequest {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            image: None,
            role,
        }
    }

    pub fn review_request(product_id: ProductId, rating: u8) -> CreateReviewRequest {
        CreateReviewRequest {
            product_id,
            rating,
            review: "Does what it says".to_string(),
        }
    }

    pub fn order_request(lines: &[(ProductId, u32)]) -> CreateOrderRequest {
        CreateOrderRequest {
            items: lines
                .iter()
                .map(|&(product_id, quantity)| OrderLineRequest {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    /// Identifiers of a seeded catalog.
    #[derive(Debug, Clone)]
    pub struct Seeded {
        pub lighting: Category,
        pub kitchen: Category,
        /// Lamp (10.0) and Lantern (25.0) in lighting, Kettle (40.0) in kitchen.
        pub products: Vec<Product>,
        pub admin: User,
        pub buyer: User,
    }

    impl Seeded {
        pub fn admin_actor(&self) -> Actor {
            Actor::new(self.admin.id, Role::Admin)
        }

        pub fn buyer_actor(&self) -> Actor {
            Actor::new(self.buyer.id, Role::Buyer)
        }

        pub fn product(&self, name: &str) -> &Product {
            self.products
                .iter()
                .find(|p| p.name == name)
                .unwrap_or_else(|| panic!("no seeded product named {}", name))
        }
    }

    /// Fill `catalog` with two categories, three products and two users.
    pub async fn seed_catalog(catalog: &dyn CatalogRepository) -> StorefrontResult<Seeded> {
        let lighting = catalog.category_insert(&category_request("Lighting")).await?;
        let kitchen = catalog.category_insert(&category_request("Kitchen")).await?;

        let mut products = Vec::new();
        for (name, price, category_id) in [
            ("Lamp", 10.0, lighting.id),
            ("Lantern", 25.0, lighting.id),
            ("Kettle", 40.0, kitchen.id),
        ] {
            products.push(
                catalog
                    .product_insert(&product_request(name, price, category_id))
                    .await?,
            );
        }

        let admin = catalog.user_insert(&user_request("Ada", Role::Admin)).await?;
        let buyer = catalog.user_insert(&user_request("Bo", Role::Buyer)).await?;

        Ok(Seeded {
            lighting,
            kitchen,
            products,
            admin,
            buyer,
        })
    }
}

pub use fixtures::{seed_catalog, Seeded};
