//! Package identity of the core engine.

use keystone_core::{Address, Extensions, Provenance, VersionWitness};

/// Address the core engine is published at.
pub const PACKAGE: Address = Address::from_u64(0x1);

/// Current version of the core engine.
pub const VERSION: u64 = 1;

#[derive(Clone, Copy)]
pub(crate) struct V1(());

impl Provenance for V1 {
    const PACKAGE: Address = PACKAGE;
    const MODULE: &'static str = "version";
}

/// Version witness of the core engine.
pub(crate) fn current() -> VersionWitness {
    VersionWitness::new(V1(()))
}

/// A whitelist containing only the current core engine.
pub fn core_extensions() -> Extensions {
    Extensions::new(current(), VERSION)
}
