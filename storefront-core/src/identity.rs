//! Identity types for storefront entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behavior for strongly-typed entity identifiers.
pub trait EntityIdType: Copy + Eq + fmt::Display + FromStr {
    /// The entity type this identifier belongs to.
    const ENTITY_TYPE: EntityType;

    /// Wrap an existing UUID.
    fn new(uuid: Uuid) -> Self;

    /// Get the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a new timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident => $entity:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const ENTITY_TYPE: EntityType = EntityType::$entity;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a catalog product.
    ProductId => Product
);
define_entity_id!(
    /// Identifier of a product category.
    CategoryId => Category
);
define_entity_id!(
    /// Identifier of a product review.
    ReviewId => Review
);
define_entity_id!(
    /// Identifier of a registered user.
    UserId => User
);
define_entity_id!(
    /// Identifier of a customer order.
    OrderId => Order
);

/// Entity type discriminator used for cache keys and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Product,
    Category,
    Review,
    User,
    Order,
}

impl EntityType {
    /// Every entity type, in a stable order.
    pub const ALL: [EntityType; 5] = [
        EntityType::Product,
        EntityType::Category,
        EntityType::Review,
        EntityType::User,
        EntityType::Order,
    ];

    /// Stable lowercase name used as the first segment of cache keys and tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "product",
            EntityType::Category => "category",
            EntityType::Review => "review",
            EntityType::User => "user",
            EntityType::Order => "order",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(EntityType::Product),
            "category" => Ok(EntityType::Category),
            "review" => Ok(EntityType::Review),
            "user" => Ok(EntityType::User),
            "order" => Ok(EntityType::Order),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_names_roundtrip() {
        for entity_type in EntityType::ALL {
            let parsed: EntityType = entity_type.as_str().parse().unwrap();
            assert_eq!(parsed, entity_type);
        }
        assert!("basket".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_typed_id_parse_and_display() {
        let id = ProductId::now_v7();
        let parsed: ProductId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(ProductId::ENTITY_TYPE, EntityType::Product);
        assert!("not-a-uuid".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_typed_id_serializes_as_plain_uuid() {
        let id = OrderId::now_v7();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
