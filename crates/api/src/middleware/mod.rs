//! Request middleware.

pub mod identity;

pub use identity::{CallerId, USER_ID_HEADER, identity_middleware};
