//! # Keystone Core
//!
//! Core primitives for the Keystone intent engine.
//!
//! This crate provides the fundamental building blocks:
//! - [`Intent`] - Proposed multi-step operation with a schedule
//! - [`Intents`] - Registry of pending intents and locked objects
//! - [`Executable`] / [`Expired`] - Linear capabilities over intent actions
//! - [`Unconfirmed`] - A refused confirmation, possibly handing the executable back
//! - [`Deps`] - Packages authorized to act on an account
//! - [`KeystoneError`] - Engine error types

pub mod deps;
pub mod error;
pub mod executable;
pub mod extensions;
pub mod intent;
pub mod metadata;
pub mod provenance;
pub mod registry;
pub mod types;

// Re-exports for convenience
pub use deps::{Dependency, Deps};
pub use error::{KeystoneError, Result};
pub use executable::{Executable, Expired, Unconfirmed};
pub use extensions::{Extension, Extensions, History, CORE_DEP_NAME};
pub use intent::{Intent, Params};
pub use metadata::Metadata;
pub use provenance::{new_role, Provenance, TypeTag, VersionWitness};
pub use registry::Intents;
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::deps::{Dependency, Deps};
    pub use crate::error::{KeystoneError, Result};
    pub use crate::executable::{Executable, Expired, Unconfirmed};
    pub use crate::extensions::{Extensions, CORE_DEP_NAME};
    pub use crate::intent::{Intent, Params};
    pub use crate::metadata::Metadata;
    pub use crate::provenance::{Provenance, VersionWitness};
    pub use crate::registry::Intents;
    pub use crate::types::{Address, Clock, ObjectId};
}
