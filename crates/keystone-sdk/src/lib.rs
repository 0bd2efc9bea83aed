//! # Keystone SDK
//!
//! Everything an extension needs to stack actions into account intents and
//! execute them back out.
//!
//! - [`build_intent`] / [`process_intent`] - Extension contract helpers
//! - [`owned`] - Built-in withdrawal action
//! - [`config`] - Built-in account configuration intents

pub mod intent_interface;

pub use intent_interface::{build_intent, process_intent};
pub use keystone_account::{config, owned, version, Account, AccountConfig, Auth};
pub use keystone_state::{Asset, StoreKey};

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::intent_interface::{build_intent, process_intent};
    pub use keystone_account::prelude::*;
    pub use keystone_state::StoreKey;
}
