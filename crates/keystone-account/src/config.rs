//! Intents editing the account itself.
//!
//! Metadata, dependencies and the unverified-deps flag can only change through
//! the config module: either directly with an [`Auth`], or through a single
//! execution intent that goes through the account's approval flow.

use keystone_core::{
    Address, Dependency, Deps, Executable, Expired, Extensions, KeystoneError, Metadata, Params,
    Provenance, Result, VersionWitness,
};
use tracing::info;

use crate::account::{Account, AccountConfig, Auth};
use crate::version;

/// Witness of the metadata intent.
#[derive(Clone, Copy)]
pub struct ConfigMetadataIntent(());

impl Provenance for ConfigMetadataIntent {
    const PACKAGE: Address = version::PACKAGE;
    const MODULE: &'static str = "config";
}

/// Witness of the dependencies intent.
#[derive(Clone, Copy)]
pub struct ConfigDepsIntent(());

impl Provenance for ConfigDepsIntent {
    const PACKAGE: Address = version::PACKAGE;
    const MODULE: &'static str = "config";
}

/// Witness of the unverified-deps toggle intent.
#[derive(Clone, Copy)]
pub struct ToggleUnverifiedAllowedIntent(());

impl Provenance for ToggleUnverifiedAllowedIntent {
    const PACKAGE: Address = version::PACKAGE;
    const MODULE: &'static str = "config";
}

/// Replace the account metadata.
#[derive(Debug, Clone)]
pub struct ConfigMetadataAction {
    metadata: Metadata,
}

/// Replace the account dependencies.
#[derive(Debug, Clone)]
pub struct ConfigDepsAction {
    deps: Deps,
}

/// Flip whether unverified dependencies may be added.
#[derive(Debug, Clone, Copy)]
pub struct ToggleUnverifiedAllowedAction;

// === Direct edits ===

/// Replace the metadata right away.
pub fn edit_metadata<C: AccountConfig>(
    auth: Auth,
    account: &mut Account<C>,
    keys: Vec<String>,
    values: Vec<String>,
) -> Result<()> {
    account.verify(auth)?;
    *account.metadata_mut() = Metadata::from_keys_values(keys, values)?;
    info!("Edited metadata of account {}", account.addr());
    Ok(())
}

/// Move every whitelisted dependency to its latest version right away.
pub fn update_extensions_to_latest<C: AccountConfig>(
    auth: Auth,
    account: &mut Account<C>,
    extensions: &Extensions,
) -> Result<()> {
    account.verify(auth)?;
    account.deps_mut().update_to_latest(extensions);
    info!("Updated dependencies of account {}", account.addr());
    Ok(())
}

// === Metadata intent ===

/// Propose new metadata. The intent must run exactly once.
pub fn request_config_metadata<C: AccountConfig>(
    auth: Auth,
    account: &mut Account<C>,
    params: Params,
    outcome: C::Outcome,
    keys: Vec<String>,
    values: Vec<String>,
) -> Result<()> {
    account.verify(auth)?;
    let metadata = Metadata::from_keys_values(keys, values)?;

    let witness = ConfigMetadataIntent(());
    let mut intent = account.create_intent(params, outcome, "", version::current(), witness)?;
    intent.assert_single_execution()?;
    intent.add_action(ConfigMetadataAction { metadata }, witness)?;
    account.insert_intent(intent, version::current(), witness)
}

pub fn execute_config_metadata<C: AccountConfig>(
    executable: &mut Executable<C::Outcome>,
    account: &mut Account<C>,
) -> Result<()> {
    executable.intent().assert_is_account(account.addr())?;
    let action = executable.next_action::<ConfigMetadataAction, _>(ConfigMetadataIntent(()))?;
    *account.metadata_mut() = action.metadata.clone();
    info!("Replaced metadata of account {}", account.addr());
    Ok(())
}

pub fn delete_config_metadata(expired: &mut Expired) -> Result<()> {
    expired.remove_action::<ConfigMetadataAction>()?;
    Ok(())
}

// === Dependencies intent ===

/// Propose a new dependency list, validated now against `extensions`.
///
/// The current unverified-deps flag applies. Unverified packages are bound to
/// the matching witness in `unverified`; without one they are pinned but can
/// never act on the account. The intent must run exactly once.
#[allow(clippy::too_many_arguments)]
pub fn request_config_deps<C: AccountConfig>(
    auth: Auth,
    account: &mut Account<C>,
    params: Params,
    outcome: C::Outcome,
    extensions: &Extensions,
    names: Vec<String>,
    addresses: Vec<Address>,
    versions: Vec<u64>,
    unverified: Vec<VersionWitness>,
) -> Result<()> {
    account.verify(auth)?;
    if names.len() != addresses.len() || addresses.len() != versions.len() {
        return Err(KeystoneError::DepsNotSameLength);
    }
    let entries = names
        .into_iter()
        .zip(addresses)
        .zip(versions)
        .map(|((name, addr), version)| {
            match unverified.iter().find(|w| w.package_addr() == addr) {
                Some(witness) => Dependency::bound(name, *witness, version),
                None => Dependency::new(name, addr, version),
            }
        })
        .collect();
    let deps = Deps::from_entries(extensions, account.deps().unverified_allowed(), entries)?;

    let witness = ConfigDepsIntent(());
    let mut intent = account.create_intent(params, outcome, "", version::current(), witness)?;
    intent.assert_single_execution()?;
    intent.add_action(ConfigDepsAction { deps }, witness)?;
    account.insert_intent(intent, version::current(), witness)
}

pub fn execute_config_deps<C: AccountConfig>(
    executable: &mut Executable<C::Outcome>,
    account: &mut Account<C>,
) -> Result<()> {
    executable.intent().assert_is_account(account.addr())?;
    let action = executable.next_action::<ConfigDepsAction, _>(ConfigDepsIntent(()))?;
    *account.deps_mut() = action.deps.clone();
    info!(
        "Replaced dependencies of account {} ({} entries)",
        account.addr(),
        account.deps().len()
    );
    Ok(())
}

pub fn delete_config_deps(expired: &mut Expired) -> Result<()> {
    expired.remove_action::<ConfigDepsAction>()?;
    Ok(())
}

// === Unverified toggle intent ===

/// Propose flipping the unverified-deps flag. The intent must run exactly once.
pub fn request_toggle_unverified_allowed<C: AccountConfig>(
    auth: Auth,
    account: &mut Account<C>,
    params: Params,
    outcome: C::Outcome,
) -> Result<()> {
    account.verify(auth)?;

    let witness = ToggleUnverifiedAllowedIntent(());
    let mut intent = account.create_intent(params, outcome, "", version::current(), witness)?;
    intent.assert_single_execution()?;
    intent.add_action(ToggleUnverifiedAllowedAction, witness)?;
    account.insert_intent(intent, version::current(), witness)
}

pub fn execute_toggle_unverified_allowed<C: AccountConfig>(
    executable: &mut Executable<C::Outcome>,
    account: &mut Account<C>,
) -> Result<()> {
    executable.intent().assert_is_account(account.addr())?;
    executable.next_action::<ToggleUnverifiedAllowedAction, _>(ToggleUnverifiedAllowedIntent(()))?;
    account.deps_mut().toggle_unverified_allowed();
    info!(
        "Unverified dependencies {} for account {}",
        if account.deps().unverified_allowed() { "allowed" } else { "disallowed" },
        account.addr()
    );
    Ok(())
}

pub fn delete_toggle_unverified_allowed(expired: &mut Expired) -> Result<()> {
    expired.remove_action::<ToggleUnverifiedAllowedAction>()?;
    Ok(())
}
