//! # Keystone Account
//!
//! The programmable account object and its built-in intents.
//!
//! - [`Account`] - Root object owning deps, intents, config and storage
//! - [`Auth`] - Proof that the account's config module authorized a call
//! - [`AccountConfig`] - Contract implemented by config modules
//! - [`owned`] - Withdrawal of objects sent to the account
//! - [`config`] - Intents editing the account itself

pub mod account;
pub mod config;
pub mod owned;
pub mod version;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountConfig, Auth};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::account::{Account, AccountConfig, Auth};
    pub use keystone_core::prelude::*;
    pub use keystone_state::Asset;
}
