//! Typed list filters for catalog queries.
//!
//! These are what the origin store evaluates. Query strings deserialize
//! straight into them; blank parameters become `None` so that `?search=`
//! and an omitted `search` mean the same thing.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::{OrderStatus, Role};
use crate::identity::{CategoryId, ProductId, UserId};

/// Deserialize an optional value from its string form, treating blank
/// strings as absent.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Product listing filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub category_id: Option<CategoryId>,
    /// Case-insensitive match against name or description.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub search: Option<String>,
    /// Price ceiling (inclusive).
    #[serde(default, alias = "price", deserialize_with = "empty_as_none")]
    pub max_price: Option<f64>,
    /// Rating floor (inclusive).
    #[serde(default, alias = "rating", deserialize_with = "empty_as_none")]
    pub min_rating: Option<f64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub take: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub skip: Option<u32>,
}

/// Review listing filter. Listing reviews requires a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub product_id: Option<ProductId>,
}

/// User listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub role: Option<Role>,
}

/// Order listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<OrderStatus>,
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}
