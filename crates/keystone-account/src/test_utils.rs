//! Fixture account used by the module tests.

use keystone_core::{
    Address, Deps, Extensions, KeystoneError, Provenance, Result, VersionWitness, CORE_DEP_NAME,
};

use crate::account::{Account, AccountConfig, Auth};
use crate::version;

pub(crate) const COUNCIL: Address = Address::from_u64(0xc0);

/// Executes intents once enough members approved.
pub(crate) struct Council {
    pub threshold: u64,
}

impl AccountConfig for Council {
    type Outcome = u64;
    type Witness = CouncilWitness;

    fn validate_outcome(&self, approvals: u64, role: &str) -> Result<()> {
        if approvals < self.threshold {
            return Err(KeystoneError::OutcomeRejected {
                role: role.to_string(),
                reason: "not enough approvals".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub(crate) struct CouncilWitness;

impl Provenance for CouncilWitness {
    const PACKAGE: Address = COUNCIL;
    const MODULE: &'static str = "council";
}

#[derive(Clone, Copy)]
pub(crate) struct CouncilVersion;

impl Provenance for CouncilVersion {
    const PACKAGE: Address = COUNCIL;
    const MODULE: &'static str = "version";
}

pub(crate) fn council_version() -> VersionWitness {
    VersionWitness::new(CouncilVersion)
}

/// Core engine plus the council package at v1.
pub(crate) fn council_extensions() -> Extensions {
    let mut extensions = version::core_extensions();
    extensions.add("Council", council_version(), 1).unwrap();
    extensions
}

pub(crate) fn council_account() -> Account<Council> {
    let deps =
        Deps::new_latest_from_whitelist(&council_extensions(), &[CORE_DEP_NAME, "Council"]).unwrap();
    Account::new(Council { threshold: 0 }, deps, council_version(), CouncilWitness).unwrap()
}

pub(crate) fn council_auth(account: &Account<Council>) -> Auth {
    account.new_auth(council_version(), CouncilWitness).unwrap()
}
