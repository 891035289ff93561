//! Canonical cache keys and invalidation tags.
//!
//! Every key the cache layer touches is produced by [`KeyComposer`]. Call
//! sites never concatenate key strings themselves, which is what keeps the
//! key written by a read and the key purged by an invalidation in agreement.
//!
//! # Key Format
//!
//! - single entity: `product:id:<percent-encoded id>`
//! - collection: `product:list` or `product:list:<field>=<value>&...`
//!
//! Collection fields are sorted by name and values are percent-encoded, so
//! the `id` and `list` key spaces can never collide and no filter value can
//! forge a separator.

use std::collections::BTreeMap;
use std::fmt;

use storefront_core::EntityType;

use super::error::{CacheError, CacheResult};

const SINGLE_SEGMENT: &str = "id";
const COLLECTION_SEGMENT: &str = "list";
const COLLECTION_TAG: &str = "collection";

/// What a cache key covers. Private so keys can only come from the composer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum KeyScope {
    Single(String),
    Collection,
}

/// A canonical cache key.
///
/// Can ONLY be obtained from [`KeyComposer`]; there is no public
/// constructor taking a raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    rendered: String,
    entity_type: EntityType,
    scope: KeyScope,
}

impl CacheKey {
    /// The key as stored in the backend.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// The entity type this key caches.
    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Returns true if this key caches a collection read.
    pub fn is_collection(&self) -> bool {
        matches!(self.scope, KeyScope::Collection)
    }

    /// The tags this key depends on.
    ///
    /// A single-entity key depends on its instance tag, a collection key on
    /// the collection tag of its entity type.
    pub fn dependencies(&self) -> Vec<Tag> {
        match &self.scope {
            KeyScope::Single(id) => vec![Tag::Entity {
                entity_type: self.entity_type,
                id: id.clone(),
            }],
            KeyScope::Collection => vec![Tag::Collection(self.entity_type)],
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

/// A dependency unit used for invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tag {
    /// One entity instance, `product:<id>`.
    Entity { entity_type: EntityType, id: String },
    /// Every collection read of one entity type, `product:collection`.
    Collection(EntityType),
}

impl Tag {
    /// Instance tag. The id is trimmed the same way [`KeyComposer`] trims it.
    pub fn entity(entity_type: EntityType, id: impl AsRef<str>) -> Self {
        Tag::Entity {
            entity_type,
            id: id.as_ref().trim().to_string(),
        }
    }

    pub fn collection(entity_type: EntityType) -> Self {
        Tag::Collection(entity_type)
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Tag::Entity { entity_type, .. } => *entity_type,
            Tag::Collection(entity_type) => *entity_type,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Entity { entity_type, id } => write!(f, "{}:{}", entity_type, id),
            Tag::Collection(entity_type) => write!(f, "{}:{}", entity_type, COLLECTION_TAG),
        }
    }
}

// ============================================================================
// FILTER SCHEMAS
// ============================================================================

/// How a filter field's raw value is parsed and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed, otherwise verbatim (identifiers).
    Text,
    /// Trimmed and lowercased (case-insensitive search, enum names).
    FoldedText,
    /// Finite decimal number, rendered in shortest form (`10.00` -> `10`).
    Decimal,
    /// Non-negative integer.
    Unsigned,
}

/// One field of a [`FilterSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Canonical value that means "unset". A value rendering to it is
    /// omitted from the key.
    pub default: Option<&'static str>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, kind: FieldKind, default: &'static str) -> Self {
        Self {
            name,
            kind,
            default: Some(default),
        }
    }
}

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("categoryId", FieldKind::Text),
    FieldSpec::new("maxPrice", FieldKind::Decimal),
    FieldSpec::new("minRating", FieldKind::Decimal),
    FieldSpec::new("search", FieldKind::FoldedText),
    FieldSpec::with_default("skip", FieldKind::Unsigned, "0"),
    FieldSpec::new("take", FieldKind::Unsigned),
];

const CATEGORY_FIELDS: &[FieldSpec] = &[];

const REVIEW_FIELDS: &[FieldSpec] = &[FieldSpec::new("productId", FieldKind::Text)];

const USER_FIELDS: &[FieldSpec] = &[FieldSpec::new("role", FieldKind::FoldedText)];

const ORDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("status", FieldKind::FoldedText),
    FieldSpec::new("userId", FieldKind::Text),
];

/// The filter fields an entity type's collection reads accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSchema {
    entity_type: EntityType,
    fields: &'static [FieldSpec],
}

impl FilterSchema {
    pub fn for_entity(entity_type: EntityType) -> Self {
        let fields = match entity_type {
            EntityType::Product => PRODUCT_FIELDS,
            EntityType::Category => CATEGORY_FIELDS,
            EntityType::Review => REVIEW_FIELDS,
            EntityType::User => USER_FIELDS,
            EntityType::Order => ORDER_FIELDS,
        };
        Self {
            entity_type,
            fields,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Parse every value in `filter` against this schema and return the
    /// canonical `(field, value)` pairs, sorted by field, unset values
    /// dropped.
    pub fn canonicalize(&self, filter: &FilterSet) -> CacheResult<Vec<(&'static str, String)>> {
        let mut canonical = Vec::with_capacity(filter.len());
        for (name, value) in filter.iter() {
            let field = self.field(name).ok_or_else(|| {
                CacheError::invalid_selector(
                    self.entity_type,
                    format!("unknown filter field '{}'", name),
                )
            })?;
            if let Some(rendered) = self.render(field, value)? {
                canonical.push((field.name, rendered));
            }
        }
        // FilterSet is already ordered by field name.
        Ok(canonical)
    }

    fn render(&self, field: &FieldSpec, value: &FilterValue) -> CacheResult<Option<String>> {
        let rendered = match (field.kind, value) {
            (_, FilterValue::Text(raw)) if raw.trim().is_empty() => return Ok(None),
            (FieldKind::Text, FilterValue::Text(raw)) => raw.trim().to_string(),
            (FieldKind::FoldedText, FilterValue::Text(raw)) => raw.trim().to_lowercase(),
            (FieldKind::Decimal, FilterValue::Text(raw)) => {
                let parsed = raw.trim().parse::<f64>().map_err(|_| {
                    self.bad_value(field, format!("'{}' is not a decimal", raw.trim()))
                })?;
                self.render_decimal(field, parsed)?
            }
            (FieldKind::Decimal, FilterValue::Decimal(v)) => self.render_decimal(field, *v)?,
            (FieldKind::Decimal, FilterValue::Unsigned(v)) => self.render_decimal(field, *v as f64)?,
            (FieldKind::Unsigned, FilterValue::Text(raw)) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| {
                    self.bad_value(field, format!("'{}' is not a non-negative integer", raw.trim()))
                })?
                .to_string(),
            (FieldKind::Unsigned, FilterValue::Unsigned(v)) => v.to_string(),
            (FieldKind::Unsigned, FilterValue::Decimal(v)) => {
                if !v.is_finite() || *v < 0.0 || v.fract() != 0.0 || *v > u64::MAX as f64 {
                    return Err(self.bad_value(field, format!("{} is not a non-negative integer", v)));
                }
                (*v as u64).to_string()
            }
            (FieldKind::Text | FieldKind::FoldedText, _) => {
                return Err(self.bad_value(field, "expected a text value"));
            }
        };

        if field.default == Some(rendered.as_str()) {
            return Ok(None);
        }
        Ok(Some(rendered))
    }

    fn render_decimal(&self, field: &FieldSpec, value: f64) -> CacheResult<String> {
        if !value.is_finite() {
            return Err(self.bad_value(field, format!("{} is not a finite decimal", value)));
        }
        // `-0` and `0` are the same filter.
        let value = if value == 0.0 { 0.0 } else { value };
        Ok(format!("{}", value))
    }

    fn bad_value(&self, field: &FieldSpec, reason: impl fmt::Display) -> CacheError {
        CacheError::invalid_selector(
            self.entity_type,
            format!("field '{}': {}", field.name, reason),
        )
    }
}

// ============================================================================
// SELECTORS
// ============================================================================

/// A filter value as supplied by a call site, before schema parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Decimal(f64),
    Unsigned(u64),
}

/// An unordered set of filter parameters for a collection read.
///
/// Setting a field to `None` leaves it unset, so typed filters can be
/// passed through field by field. Setting the same field twice keeps the
/// last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    values: BTreeMap<String, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw string value, parsed against the schema at compose time.
    pub fn text(self, field: &str, value: Option<impl Into<String>>) -> Self {
        self.with(field, value.map(|v| FilterValue::Text(v.into())))
    }

    /// Any displayable value (typed ids, enums), stored as text.
    pub fn display(self, field: &str, value: Option<impl fmt::Display>) -> Self {
        self.with(field, value.map(|v| FilterValue::Text(v.to_string())))
    }

    pub fn decimal(self, field: &str, value: Option<f64>) -> Self {
        self.with(field, value.map(FilterValue::Decimal))
    }

    pub fn unsigned(self, field: &str, value: Option<impl Into<u64>>) -> Self {
        self.with(field, value.map(|v| FilterValue::Unsigned(v.into())))
    }

    fn with(mut self, field: &str, value: Option<FilterValue>) -> Self {
        if let Some(value) = value {
            self.values.insert(field.to_string(), value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What a read asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Id(String),
    Filter(FilterSet),
}

impl From<FilterSet> for Selector {
    fn from(filter: FilterSet) -> Self {
        Selector::Filter(filter)
    }
}

// ============================================================================
// COMPOSER
// ============================================================================

/// Builds canonical cache keys. Pure and deterministic; never touches a
/// backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyComposer;

impl KeyComposer {
    pub fn compose(entity_type: EntityType, selector: &Selector) -> CacheResult<CacheKey> {
        match selector {
            Selector::Id(id) => Self::single(entity_type, id),
            Selector::Filter(filter) => Self::collection(entity_type, filter),
        }
    }

    /// Key for one entity.
    pub fn single(entity_type: EntityType, id: &str) -> CacheResult<CacheKey> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CacheError::invalid_selector(entity_type, "empty id"));
        }
        Ok(CacheKey {
            rendered: format!(
                "{}:{}:{}",
                entity_type,
                SINGLE_SEGMENT,
                urlencoding::encode(id)
            ),
            entity_type,
            scope: KeyScope::Single(id.to_string()),
        })
    }

    /// Key for one filtered collection read.
    pub fn collection(entity_type: EntityType, filter: &FilterSet) -> CacheResult<CacheKey> {
        let canonical = FilterSchema::for_entity(entity_type).canonicalize(filter)?;

        let mut rendered = format!("{}:{}", entity_type, COLLECTION_SEGMENT);
        for (i, (field, value)) in canonical.iter().enumerate() {
            rendered.push(if i == 0 { ':' } else { '&' });
            rendered.push_str(field);
            rendered.push('=');
            rendered.push_str(&urlencoding::encode(value));
        }

        Ok(CacheKey {
            rendered,
            entity_type,
            scope: KeyScope::Collection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn product_list(filter: FilterSet) -> String {
        KeyComposer::collection(EntityType::Product, &filter)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_single_key_format() {
        let key = KeyComposer::single(EntityType::Product, "p1").unwrap();
        assert_eq!(key.as_str(), "product:id:p1");
        assert!(!key.is_collection());
        assert_eq!(key.dependencies(), vec![Tag::entity(EntityType::Product, "p1")]);
    }

    #[test]
    fn test_single_key_encodes_separators() {
        let key = KeyComposer::single(EntityType::User, "a:b&c").unwrap();
        assert_eq!(key.as_str(), "user:id:a%3Ab%26c");
    }

    #[test]
    fn test_empty_id_is_invalid() {
        let err = KeyComposer::single(EntityType::Product, "   ").unwrap_err();
        assert!(matches!(err, CacheError::InvalidSelector { .. }));
    }

    #[test]
    fn test_unfiltered_collection_key() {
        assert_eq!(product_list(FilterSet::new()), "product:list");
        let key = KeyComposer::collection(EntityType::Category, &FilterSet::new()).unwrap();
        assert!(key.is_collection());
        assert_eq!(key.dependencies(), vec![Tag::collection(EntityType::Category)]);
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let a = FilterSet::new()
            .text("categoryId", Some("c1"))
            .decimal("maxPrice", Some(10.0));
        let b = FilterSet::new()
            .decimal("maxPrice", Some(10.0))
            .text("categoryId", Some("c1"));
        assert_eq!(product_list(a), product_list(b));
        assert_eq!(
            product_list(FilterSet::new().text("categoryId", Some("c1")).decimal("maxPrice", Some(10.0))),
            "product:list:categoryId=c1&maxPrice=10"
        );
    }

    #[test]
    fn test_blank_values_match_absent() {
        let blank = FilterSet::new()
            .text("search", Some("   "))
            .text("categoryId", Some(""))
            .text("take", None::<String>);
        assert_eq!(product_list(blank), "product:list");
    }

    #[test]
    fn test_default_skip_is_omitted() {
        assert_eq!(
            product_list(FilterSet::new().unsigned("skip", Some(0u32))),
            "product:list"
        );
        assert_eq!(
            product_list(FilterSet::new().text("skip", Some("5"))),
            "product:list:skip=5"
        );
    }

    #[test]
    fn test_decimal_rendering_is_canonical() {
        let expected = product_list(FilterSet::new().decimal("maxPrice", Some(10.0)));
        for raw in ["10", "10.0", "10.00", " 10 ", "1e1"] {
            assert_eq!(
                product_list(FilterSet::new().text("maxPrice", Some(raw))),
                expected,
                "raw value {:?}",
                raw
            );
        }
        assert_eq!(
            product_list(FilterSet::new().unsigned("maxPrice", Some(10u32))),
            expected
        );
    }

    #[test]
    fn test_search_text_is_folded() {
        let a = product_list(FilterSet::new().text("search", Some("  Desk Lamp ")));
        let b = product_list(FilterSet::new().text("search", Some("desk lamp")));
        assert_eq!(a, b);
        assert_eq!(a, "product:list:search=desk%20lamp");
    }

    #[test]
    fn test_values_cannot_forge_separators() {
        let key = product_list(FilterSet::new().text("search", Some("a&take=5")));
        assert_eq!(key, "product:list:search=a%26take%3D5");
    }

    #[test]
    fn test_unknown_field_is_invalid() {
        let err = KeyComposer::collection(
            EntityType::Product,
            &FilterSet::new().text("colour", Some("red")),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CacheError::InvalidSelector {
                entity_type: EntityType::Product,
                ..
            }
        ));
    }

    #[test]
    fn test_unparseable_values_are_invalid() {
        for filter in [
            FilterSet::new().text("maxPrice", Some("cheap")),
            FilterSet::new().text("take", Some("-1")),
            FilterSet::new().decimal("take", Some(2.5)),
            FilterSet::new().decimal("maxPrice", Some(f64::NAN)),
            FilterSet::new().unsigned("search", Some(3u32)),
        ] {
            assert!(KeyComposer::collection(EntityType::Product, &filter).is_err());
        }
    }

    #[test]
    fn test_selector_dispatch() {
        let single = KeyComposer::compose(EntityType::Order, &Selector::Id("o1".into())).unwrap();
        assert_eq!(single.as_str(), "order:id:o1");
        let list = KeyComposer::compose(
            EntityType::Order,
            &FilterSet::new().text("status", Some("PAID")).into(),
        )
        .unwrap();
        assert_eq!(list.as_str(), "order:list:status=paid");
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::entity(EntityType::Product, " p1 ").to_string(), "product:p1");
        assert_eq!(Tag::collection(EntityType::Product).to_string(), "product:collection");
    }

    fn product_fields() -> impl Strategy<Value = Vec<(&'static str, String)>> {
        (
            proptest::option::of("[a-z0-9]{1,8}"),
            proptest::option::of("[ A-Za-z]{0,12}"),
            proptest::option::of(0u32..100_000),
            proptest::option::of(0u32..50),
        )
            .prop_map(|(category, search, cents, take)| {
                let mut fields = Vec::new();
                if let Some(category) = category {
                    fields.push(("categoryId", category));
                }
                if let Some(search) = search {
                    fields.push(("search", search));
                }
                if let Some(cents) = cents {
                    fields.push(("maxPrice", format!("{}.{:02}", cents / 100, cents % 100)));
                }
                if let Some(take) = take {
                    fields.push(("take", take.to_string()));
                }
                fields
            })
    }

    proptest! {
        #[test]
        fn prop_permutations_compose_equal_keys(
            fields in product_fields(),
            seed in any::<u64>(),
        ) {
            let forward = fields
                .iter()
                .fold(FilterSet::new(), |set, (k, v)| set.text(k, Some(v.as_str())));

            let mut shuffled = fields.clone();
            let len = shuffled.len().max(1);
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
            let backward = shuffled
                .iter()
                .fold(FilterSet::new(), |set, (k, v)| set.text(k, Some(v.as_str())));

            prop_assert_eq!(
                KeyComposer::collection(EntityType::Product, &forward).unwrap(),
                KeyComposer::collection(EntityType::Product, &backward).unwrap()
            );
        }

        #[test]
        fn prop_padding_and_case_do_not_change_search_key(search in "[a-z ]{1,16}") {
            let plain = FilterSet::new().text("search", Some(search.as_str()));
            let noisy = FilterSet::new().text("search", Some(format!("  {}  ", search.to_uppercase())));
            prop_assert_eq!(
                KeyComposer::collection(EntityType::Product, &plain).unwrap(),
                KeyComposer::collection(EntityType::Product, &noisy).unwrap()
            );
        }
    }
}
