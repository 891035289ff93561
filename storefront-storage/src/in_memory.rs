//! In-memory origin store.
//!
//! Backs the development server and the tests. All tables sit behind one
//! lock so multi-table commits (an order taking stock) are atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use storefront_core::{
    Category, CategoryId, CreateCategoryRequest, CreateOrderRequest, CreateProductRequest,
    CreateReviewRequest, CreateUserRequest, EntityIdType, EntityType, Order, OrderFilter,
    OrderId, OrderItem, OrderStatus, Product, ProductFilter, ProductId, Review, ReviewFilter,
    ReviewId, StorageError, StorefrontError, StorefrontResult, UpdateCategoryRequest,
    UpdateProductRequest, UpdateReviewRequest, UpdateUserRequest, User, UserFilter, UserId,
};

use crate::repository::CatalogRepository;

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    categories: HashMap<CategoryId, Category>,
    reviews: HashMap<ReviewId, Review>,
    users: HashMap<UserId, User>,
    orders: HashMap<OrderId, Order>,
}

/// In-memory [`CatalogRepository`].
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tables: RwLock<Tables>,
    reads: AtomicU64,
}

impl InMemoryCatalog {
    /// Create a new, empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorefrontResult<RwLockReadGuard<'_, Tables>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.tables
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> StorefrontResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    /// Number of get/list calls served so far.
    pub fn origin_reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Get count of stored products.
    pub fn product_count(&self) -> usize {
        self.tables.read().map(|t| t.products.len()).unwrap_or(0)
    }
}

fn not_found(entity_type: EntityType, id: impl ToString) -> StorefrontError {
    StorefrontError::not_found(entity_type, id)
}

fn dangling(entity_type: EntityType, id: impl ToString) -> StorefrontError {
    StorageError::DanglingReference {
        entity_type,
        id: id.to_string(),
    }
    .into()
}

fn insufficient_stock(product: &Product, requested: u32) -> StorefrontError {
    StorageError::InsertFailed {
        entity_type: EntityType::Order,
        reason: format!(
            "insufficient stock for product {}: {} requested, {} available",
            product.id, requested, product.stock
        ),
    }
    .into()
}

fn matches_product(product: &Product, filter: &ProductFilter) -> bool {
    if filter.category_id.is_some_and(|c| c != product.category_id) {
        return false;
    }
    if let Some(search) = filter.search.as_deref().map(str::trim) {
        let needle = search.to_lowercase();
        if !needle.is_empty()
            && !product.name.to_lowercase().contains(&needle)
            && !product.description.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if filter.max_price.is_some_and(|max| product.price > max) {
        return false;
    }
    if filter.min_rating.is_some_and(|min| product.rating < min) {
        return false;
    }
    true
}

#[async_trait]
impl CatalogRepository for InMemoryCatalog {
    // === Product Operations ===

    async fn product_get(&self, id: ProductId) -> StorefrontResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn product_list(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>> {
        let tables = self.read()?;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| matches_product(p, filter))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let skip = filter.skip.unwrap_or(0) as usize;
        let take = filter.take.map(|t| t as usize).unwrap_or(usize::MAX);
        Ok(products.into_iter().skip(skip).take(take).collect())
    }

    async fn product_insert(&self, req: &CreateProductRequest) -> StorefrontResult<Product> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&req.category_id) {
            return Err(dangling(EntityType::Category, req.category_id));
        }
        let now = Utc::now();
        let product = Product {
            id: ProductId::now_v7(),
            name: req.name.clone(),
            description: req.description.clone(),
            image: req.image.clone(),
            price: req.price,
            rating: req.rating,
            stock: req.stock,
            category_id: req.category_id,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn product_update(
        &self,
        id: ProductId,
        req: &UpdateProductRequest,
    ) -> StorefrontResult<Product> {
        let mut tables = self.write()?;
        if let Some(category_id) = req.category_id {
            if !tables.categories.contains_key(&category_id) {
                return Err(dangling(EntityType::Category, category_id));
            }
        }
        let product = tables
            .products
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Product, id))?;

        if let Some(name) = &req.name {
            product.name = name.clone();
        }
        if let Some(description) = &req.description {
            product.description = description.clone();
        }
        if let Some(image) = &req.image {
            product.image = image.clone();
        }
        if let Some(price) = req.price {
            product.price = price;
        }
        if let Some(rating) = req.rating {
            product.rating = rating;
        }
        if let Some(stock) = req.stock {
            product.stock = stock;
        }
        if let Some(category_id) = req.category_id {
            product.category_id = category_id;
        }
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn product_delete(&self, id: ProductId) -> StorefrontResult<Product> {
        self.write()?
            .products
            .remove(&id)
            .ok_or_else(|| not_found(EntityType::Product, id))
    }

    // === Category Operations ===

    async fn category_get(&self, id: CategoryId) -> StorefrontResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn category_list(&self) -> StorefrontResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.read()?.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn category_insert(&self, req: &CreateCategoryRequest) -> StorefrontResult<Category> {
        let now = Utc::now();
        let category = Category {
            id: CategoryId::now_v7(),
            name: req.name.clone(),
            description: req.description.clone(),
            image: req.image.clone(),
            created_at: now,
            updated_at: now,
        };
        self.write()?
            .categories
            .insert(category.id, category.clone());
        Ok(category)
    }

    async fn category_update(
        &self,
        id: CategoryId,
        req: &UpdateCategoryRequest,
    ) -> StorefrontResult<Category> {
        let mut tables = self.write()?;
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Category, id))?;
        if let Some(name) = &req.name {
            category.name = name.clone();
        }
        if let Some(description) = &req.description {
            category.description = description.clone();
        }
        if let Some(image) = &req.image {
            category.image = image.clone();
        }
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn category_delete(&self, id: CategoryId) -> StorefrontResult<Category> {
        let mut tables = self.write()?;
        if tables.products.values().any(|p| p.category_id == id) {
            return Err(StorageError::UpdateFailed {
                entity_type: EntityType::Category,
                id: id.to_string(),
                reason: "category still has products".to_string(),
            }
            .into());
        }
        tables
            .categories
            .remove(&id)
            .ok_or_else(|| not_found(EntityType::Category, id))
    }

    // === Review Operations ===

    async fn review_get(&self, id: ReviewId) -> StorefrontResult<Option<Review>> {
        Ok(self.read()?.reviews.get(&id).cloned())
    }

    async fn review_list(&self, filter: &ReviewFilter) -> StorefrontResult<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .read()?
            .reviews
            .values()
            .filter(|r| filter.product_id.map_or(true, |p| r.product_id == p))
            .cloned()
            .collect();
        reviews.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(reviews)
    }

    async fn review_insert(
        &self,
        author: UserId,
        req: &CreateReviewRequest,
    ) -> StorefrontResult<Review> {
        let mut tables = self.write()?;
        if !tables.products.contains_key(&req.product_id) {
            return Err(dangling(EntityType::Product, req.product_id));
        }
        let now = Utc::now();
        let review = Review {
            id: ReviewId::now_v7(),
            product_id: req.product_id,
            user_id: author,
            rating: req.rating,
            review: req.review.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn review_update(
        &self,
        id: ReviewId,
        req: &UpdateReviewRequest,
    ) -> StorefrontResult<Review> {
        let mut tables = self.write()?;
        let review = tables
            .reviews
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Review, id))?;
        if let Some(rating) = req.rating {
            review.rating = rating;
        }
        if let Some(text) = &req.review {
            review.review = text.clone();
        }
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn review_delete(&self, id: ReviewId) -> StorefrontResult<Review> {
        self.write()?
            .reviews
            .remove(&id)
            .ok_or_else(|| not_found(EntityType::Review, id))
    }

    // === User Operations ===

    async fn user_get(&self, id: UserId) -> StorefrontResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_list(&self, filter: &UserFilter) -> StorefrontResult<Vec<User>> {
        let mut users: Vec<User> = self
            .read()?
            .users
            .values()
            .filter(|u| filter.role.map_or(true, |role| u.role == role))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn user_insert(&self, req: &CreateUserRequest) -> StorefrontResult<User> {
        let mut tables = self.write()?;
        let email = req.email.trim().to_lowercase();
        if tables.users.values().any(|u| u.email == email) {
            return Err(StorageError::InsertFailed {
                entity_type: EntityType::User,
                reason: format!("email {} already registered", email),
            }
            .into());
        }
        let now = Utc::now();
        let user = User {
            id: UserId::now_v7(),
            name: req.name.clone(),
            email,
            image: req.image.clone(),
            role: req.role,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_update(&self, id: UserId, req: &UpdateUserRequest) -> StorefrontResult<User> {
        let mut tables = self.write()?;
        let email = req.email.as_deref().map(|e| e.trim().to_lowercase());
        if let Some(email) = &email {
            if tables
                .users
                .values()
                .any(|u| u.id != id && &u.email == email)
            {
                return Err(StorageError::UpdateFailed {
                    entity_type: EntityType::User,
                    id: id.to_string(),
                    reason: format!("email {} already registered", email),
                }
                .into());
            }
        }
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::User, id))?;
        if let Some(name) = &req.name {
            user.name = name.clone();
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(image) = &req.image {
            user.image = Some(image.clone());
        }
        if let Some(role) = req.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn user_delete(&self, id: UserId) -> StorefrontResult<User> {
        self.write()?
            .users
            .remove(&id)
            .ok_or_else(|| not_found(EntityType::User, id))
    }

    // === Order Operations ===

    async fn order_get(&self, id: OrderId) -> StorefrontResult<Option<Order>> {
        Ok(self.read()?.orders.get(&id).cloned())
    }

    async fn order_list(&self, filter: &OrderFilter) -> StorefrontResult<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .read()?
            .orders
            .values()
            .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }

    async fn order_insert(
        &self,
        buyer: UserId,
        req: &CreateOrderRequest,
    ) -> StorefrontResult<Order> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&buyer) {
            return Err(dangling(EntityType::User, buyer));
        }

        // Sum quantities per product and check every total before touching
        // stock, so a failed order changes nothing and repeated lines for
        // one product cannot overdraw it.
        let mut requested: BTreeMap<ProductId, u32> = BTreeMap::new();
        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            let product = tables
                .products
                .get(&line.product_id)
                .ok_or_else(|| dangling(EntityType::Product, line.product_id))?;
            let total = requested.entry(product.id).or_insert(0);
            *total = total
                .checked_add(line.quantity)
                .ok_or_else(|| insufficient_stock(product, u32::MAX))?;
            items.push(OrderItem {
                product_id: product.id,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        let mut remaining = Vec::with_capacity(requested.len());
        for (product_id, quantity) in &requested {
            let product = tables
                .products
                .get(product_id)
                .ok_or_else(|| dangling(EntityType::Product, *product_id))?;
            let left = product
                .stock
                .checked_sub(*quantity)
                .ok_or_else(|| insufficient_stock(product, *quantity))?;
            remaining.push((*product_id, left));
        }

        let now = Utc::now();
        for (product_id, left) in remaining {
            if let Some(product) = tables.products.get_mut(&product_id) {
                product.stock = left;
                product.updated_at = now;
            }
        }

        let order = Order {
            id: OrderId::now_v7(),
            user_id: buyer,
            total: Order::compute_total(&items),
            items,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn order_update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> StorefrontResult<Order> {
        let mut tables = self.write()?;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Order, id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
