//! Utility macros for reducing boilerplate

/// Implement `FromRef<AppState>` for a field of the state, so handlers can
/// extract it with `State<T>`.
///
/// # Example
/// ```ignore
/// impl_from_ref!(CatalogService, catalog);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for CatalogService {
///     fn from_ref(state: &AppState) -> Self {
///         state.catalog.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
