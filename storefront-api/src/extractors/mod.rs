//! Request extractors.

mod actor;
mod filter;
mod path_id;

pub use actor::{ActingUser, USER_ID_HEADER, USER_ROLE_HEADER};
pub use filter::Filter;
pub use path_id::PathId;
