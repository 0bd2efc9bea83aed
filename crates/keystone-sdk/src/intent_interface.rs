//! Extension contract helpers.
//!
//! Every extension builds intents the same way: create an empty intent under
//! its own witness, stack typed actions, insert it. And executes them the same
//! way: check it is still a dependency, then pop its actions in order. These
//! helpers wrap that boilerplate around a closure holding the extension logic.

use keystone_account::{Account, AccountConfig};
use keystone_core::{Executable, Intent, Params, Provenance, Result, VersionWitness};
use tracing::debug;

/// Create an intent for `account`, let `add_actions` fill it, then insert it.
///
/// The key is checked before `add_actions` runs. If filling or inserting the
/// intent fails, nothing is queued and every object locked for it with
/// [`Account::lock_object_for`] is released.
pub fn build_intent<C, IW, F>(
    account: &mut Account<C>,
    params: Params,
    outcome: C::Outcome,
    managed_name: &str,
    version_witness: VersionWitness,
    intent_witness: IW,
    add_actions: F,
) -> Result<()>
where
    C: AccountConfig,
    IW: Provenance + Copy,
    F: FnOnce(&mut Intent<C::Outcome>, &mut Account<C>, IW) -> Result<()>,
{
    account.intents().assert_key_available(params.key())?;
    let mut intent = account.create_intent(
        params,
        outcome,
        managed_name,
        version_witness,
        intent_witness,
    )?;
    if let Err(err) = add_actions(&mut intent, account, intent_witness) {
        account.discard_intent(intent, version_witness)?;
        return Err(err);
    }

    debug!(
        "Built intent {} with {} actions",
        intent.key(),
        intent.actions_len()
    );
    account.insert_intent(intent, version_witness, intent_witness)
}

/// Run `process_actions` over an executable after checking the caller is
/// still a dependency of `account`.
pub fn process_intent<C, IW, F, R>(
    account: &mut Account<C>,
    executable: &mut Executable<C::Outcome>,
    version_witness: VersionWitness,
    intent_witness: IW,
    process_actions: F,
) -> Result<R>
where
    C: AccountConfig,
    IW: Provenance + Copy,
    F: FnOnce(&mut Executable<C::Outcome>, &mut Account<C>, IW) -> Result<R>,
{
    account.deps().check(version_witness)?;
    executable.intent().assert_witness::<IW>()?;

    debug!(
        "Processing intent {} from action {}",
        executable.intent().key(),
        executable.action_idx()
    );
    process_actions(executable, account, intent_witness)
}
