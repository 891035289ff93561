//! Request Validation
//!
//! Field checks applied before a request reaches the origin store. The
//! building blocks are small traits on primitive values; [`Validate`] ties
//! them together per request type.

use once_cell::sync::Lazy;
use regex::Regex;
use storefront_core::{
    CreateCategoryRequest, CreateOrderRequest, CreateProductRequest, CreateReviewRequest,
    CreateUserRequest, UpdateCategoryRequest, UpdateProductRequest, UpdateReviewRequest,
    UpdateUserRequest,
};

use crate::error::{ApiError, ApiResult, ErrorCode};

/// Product ratings are averages and may be fractional.
pub const PRODUCT_RATING_RANGE: (f64, f64) = (0.0, 5.0);
/// Review ratings are whole stars.
pub const REVIEW_RATING_RANGE: (u8, u8) = (1, 5);

static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").ok());

/// Trait for validating non-empty strings.
///
/// # Example
/// ```ignore
/// req.name.validate_non_empty("name")?;
/// ```
pub trait ValidateNonEmpty {
    /// Returns `ApiError::missing_field` if the value is empty or
    /// whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        if self.trim().is_empty() {
            return Err(ApiError::missing_field(field_name));
        }
        Ok(())
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> ApiResult<()> {
        self.as_str().validate_non_empty(field_name)
    }
}

/// Trait for validating numeric ranges.
pub trait ValidateRange {
    /// Validate that the value is positive (> 0).
    fn validate_positive(&self, field_name: &str) -> ApiResult<()>;

    /// Validate that the value is within an inclusive range.
    fn validate_range(&self, field_name: &str, min: Self, max: Self) -> ApiResult<()>
    where
        Self: Sized;
}

macro_rules! impl_validate_range {
    ($($t:ty),*) => {
        $(
            impl ValidateRange for $t {
                fn validate_positive(&self, field_name: &str) -> ApiResult<()> {
                    if *self == 0 {
                        return Err(ApiError::invalid_range(field_name, 1, <$t>::MAX));
                    }
                    Ok(())
                }

                fn validate_range(&self, field_name: &str, min: Self, max: Self) -> ApiResult<()> {
                    if *self < min || *self > max {
                        return Err(ApiError::invalid_range(field_name, min, max));
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_validate_range!(u8, u32);

impl ValidateRange for f64 {
    fn validate_positive(&self, field_name: &str) -> ApiResult<()> {
        if !self.is_finite() || *self <= 0.0 {
            return Err(ApiError::new(
                ErrorCode::InvalidRange,
                format!("Field '{}' must be a positive number", field_name),
            ));
        }
        Ok(())
    }

    fn validate_range(&self, field_name: &str, min: Self, max: Self) -> ApiResult<()> {
        if !self.is_finite() || *self < min || *self > max {
            return Err(ApiError::invalid_range(field_name, min, max));
        }
        Ok(())
    }
}

/// Check that `value` is an absolute http(s) URL with a host.
pub fn validate_url(value: &str, field_name: &str) -> ApiResult<()> {
    let value = value.trim();
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| ApiError::invalid_format(field_name, "http(s) URL"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(ApiError::invalid_format(field_name, "http(s) URL"));
    }
    Ok(())
}

pub fn validate_email(value: &str, field_name: &str) -> ApiResult<()> {
    let matches = EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value.trim()));
    if !matches {
        return Err(ApiError::invalid_format(field_name, "email address"));
    }
    Ok(())
}

/// Trait for checking if an update request has any fields set.
pub trait HasUpdates {
    fn has_any_updates(&self) -> bool;

    /// Validate that at least one update field is set.
    fn validate_has_updates(&self) -> ApiResult<()> {
        if !self.has_any_updates() {
            return Err(ApiError::invalid_input(
                "At least one field must be provided for update",
            ));
        }
        Ok(())
    }
}

impl HasUpdates for UpdateProductRequest {
    fn has_any_updates(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.image.is_some()
            || self.price.is_some()
            || self.rating.is_some()
            || self.stock.is_some()
            || self.category_id.is_some()
    }
}

impl HasUpdates for UpdateCategoryRequest {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.description.is_some() || self.image.is_some()
    }
}

impl HasUpdates for UpdateReviewRequest {
    fn has_any_updates(&self) -> bool {
        self.rating.is_some() || self.review.is_some()
    }
}

impl HasUpdates for UpdateUserRequest {
    fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.email.is_some() || self.image.is_some() || self.role.is_some()
    }
}

/// Whole-request validation.
pub trait Validate {
    fn validate(&self) -> ApiResult<()>;
}

fn product_rating(rating: f64) -> ApiResult<()> {
    let (min, max) = PRODUCT_RATING_RANGE;
    rating.validate_range("rating", min, max)
}

fn review_rating(rating: u8) -> ApiResult<()> {
    let (min, max) = REVIEW_RATING_RANGE;
    rating.validate_range("rating", min, max)
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> ApiResult<()> {
        self.name.validate_non_empty("name")?;
        self.description.validate_non_empty("description")?;
        validate_url(&self.image, "image")?;
        self.price.validate_positive("price")?;
        product_rating(self.rating)
    }
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> ApiResult<()> {
        self.validate_has_updates()?;
        if let Some(name) = &self.name {
            name.validate_non_empty("name")?;
        }
        if let Some(description) = &self.description {
            description.validate_non_empty("description")?;
        }
        if let Some(image) = &self.image {
            validate_url(image, "image")?;
        }
        if let Some(price) = self.price {
            price.validate_positive("price")?;
        }
        if let Some(rating) = self.rating {
            product_rating(rating)?;
        }
        Ok(())
    }
}

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> ApiResult<()> {
        self.name.validate_non_empty("name")?;
        self.description.validate_non_empty("description")?;
        validate_url(&self.image, "image")
    }
}

impl Validate for UpdateCategoryRequest {
    fn validate(&self) -> ApiResult<()> {
        self.validate_has_updates()?;
        if let Some(name) = &self.name {
            name.validate_non_empty("name")?;
        }
        if let Some(description) = &self.description {
            description.validate_non_empty("description")?;
        }
        if let Some(image) = &self.image {
            validate_url(image, "image")?;
        }
        Ok(())
    }
}

impl Validate for CreateReviewRequest {
    fn validate(&self) -> ApiResult<()> {
        review_rating(self.rating)?;
        self.review.validate_non_empty("review")
    }
}

impl Validate for UpdateReviewRequest {
    fn validate(&self) -> ApiResult<()> {
        self.validate_has_updates()?;
        if let Some(rating) = self.rating {
            review_rating(rating)?;
        }
        if let Some(review) = &self.review {
            review.validate_non_empty("review")?;
        }
        Ok(())
    }
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> ApiResult<()> {
        self.name.validate_non_empty("name")?;
        validate_email(&self.email, "email")
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> ApiResult<()> {
        self.validate_has_updates()?;
        if let Some(name) = &self.name {
            name.validate_non_empty("name")?;
        }
        if let Some(email) = &self.email {
            validate_email(email, "email")?;
        }
        Ok(())
    }
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.items.is_empty() {
            return Err(ApiError::missing_field("items"));
        }
        for line in &self.items {
            line.quantity.validate_positive("quantity")?;
        }
        Ok(())
    }
}
