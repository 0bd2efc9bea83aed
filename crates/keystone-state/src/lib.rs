//! # Keystone State
//!
//! Account-scoped managed storage for extension modules.

pub mod managed;
pub mod store;

pub use managed::{Asset, ManagedStorage};
pub use store::{StoreKey, TypedStore};
