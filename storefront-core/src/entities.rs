//! Catalog entities
//!
//! Plain data structures shared by the storage and API layers. Field names
//! serialize in camelCase to match the JSON the catalog has always served.

use serde::{Deserialize, Serialize};

use crate::identity::{CategoryId, OrderId, ProductId, ReviewId, Timestamp, UserId};

/// A product listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image: String,
    /// Unit price in the store currency.
    pub price: f64,
    /// Average rating, 0 to 5.
    pub rating: f64,
    pub stock: u32,
    pub category_id: CategoryId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub image: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A review left by a user on a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// Integer score, 1 to 5.
    pub rating: u8,
    pub review: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Role granted to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Seller,
    #[default]
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Buyer => "buyer",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "seller" => Ok(Role::Seller),
            "buyer" => Ok(Role::Buyer),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A registered user. Credentials never leave the auth service, so this
/// record carries profile data only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub role: Role,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price captured at checkout.
    pub unit_price: f64,
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: OrderStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Sum of `quantity * unit_price` over all items.
    pub fn compute_total(items: &[OrderItem]) -> f64 {
        items
            .iter()
            .map(|item| item.unit_price * f64::from(item.quantity))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;
    use chrono::Utc;

    #[test]
    fn test_product_serializes_camel_case() {
        let now = Utc::now();
        let product = Product {
            id: ProductId::now_v7(),
            name: "Lamp".to_string(),
            description: "Desk lamp".to_string(),
            image: "https://img.example/lamp.png".to_string(),
            price: 10.0,
            rating: 4.5,
            stock: 3,
            category_id: CategoryId::now_v7(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("categoryId").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_role_parse_and_default() {
        assert_eq!(Role::default(), Role::Buyer);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_order_total() {
        let items = vec![
            OrderItem {
                product_id: ProductId::now_v7(),
                quantity: 2,
                unit_price: 10.0,
            },
            OrderItem {
                product_id: ProductId::now_v7(),
                quantity: 1,
                unit_price: 5.5,
            },
        ];
        assert!((Order::compute_total(&items) - 25.5).abs() < f64::EPSILON);
    }
}
