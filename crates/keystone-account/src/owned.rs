//! Withdrawal of objects owned by the account.
//!
//! Any extension can stack a [`WithdrawAction`] into its own intents. The
//! object is locked when the intent is proposed, so no other pending intent
//! can claim it, and unlocked when the action is executed or cleaned up. A
//! proposal that is never queued releases it again.

use keystone_core::{Executable, Expired, Intent, KeystoneError, ObjectId, Provenance, Result};
use keystone_state::Asset;
use tracing::debug;

use crate::account::{Account, AccountConfig};
use crate::version;

/// Withdraw the object `object_id` from the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawAction {
    object_id: ObjectId,
}

impl WithdrawAction {
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }
}

/// Lock `object_id` and append a withdrawal to `intent`.
///
/// Fails with [`KeystoneError::ObjectAlreadyLocked`] if another pending
/// intent already reserved the object. The lock is tied to `intent` until it
/// is queued, so a refused or discarded intent frees the object.
pub fn request_withdraw<C, IW>(
    intent: &mut Intent<C::Outcome>,
    account: &mut Account<C>,
    object_id: ObjectId,
    intent_witness: IW,
) -> Result<()>
where
    C: AccountConfig,
    IW: Provenance,
{
    intent.assert_is_account(account.addr())?;
    intent.assert_witness::<IW>()?;

    account.lock_object_for(intent, object_id, version::current())?;
    intent.add_action(WithdrawAction { object_id }, intent_witness)
}

/// Process the next withdrawal, handing back the received object.
///
/// The object must be the one locked at proposal time; on mismatch the action
/// stays at the cursor.
pub fn do_withdraw<C, A, IW>(
    executable: &mut Executable<C::Outcome>,
    account: &mut Account<C>,
    received: A,
    intent_witness: IW,
) -> Result<A>
where
    C: AccountConfig,
    A: Asset,
    IW: Provenance + Copy,
{
    executable.intent().assert_is_account(account.addr())?;
    let expected = executable
        .peek_action::<WithdrawAction, IW>(intent_witness)?
        .object_id;
    if received.id() != expected {
        return Err(KeystoneError::WrongObject {
            expected,
            actual: received.id(),
        });
    }
    executable.next_action::<WithdrawAction, IW>(intent_witness)?;

    account.unlock_object(expected, version::current())?;
    debug!("Withdrew object {} from account {}", expected, account.addr());
    Ok(received)
}

/// Release the object reserved by a withdrawal that will not run again.
///
/// A withdrawal that already ran released its object then, and the object may
/// be locked by a newer intent since; only unexecuted withdrawals unlock.
pub fn delete_withdraw<C: AccountConfig>(
    expired: &mut Expired,
    account: &mut Account<C>,
) -> Result<()> {
    if expired.account() != account.addr() {
        return Err(KeystoneError::WrongAccount {
            expected: account.addr(),
            actual: expired.account(),
        });
    }
    let action = expired.remove_action::<WithdrawAction>()?;
    if expired.confirmed_executions() > 0 {
        return Ok(());
    }
    account.unlock_object(action.object_id, version::current())
}
