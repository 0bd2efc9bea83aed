//! Linear capabilities over an intent's actions.
//!
//! [`Executable`] walks the actions of a due intent in order and must be
//! confirmed once every action was processed. [`Expired`] hands the actions of
//! a finished or expired intent back to their modules for cleanup and must be
//! emptied. Both panic when dropped before they were consumed.

use std::any::{type_name, Any};
use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::error::{KeystoneError, Result};
use crate::intent::{ActionEntry, Intent};
use crate::provenance::Provenance;
use crate::types::Address;

/// Panics on drop while armed.
#[derive(Debug)]
struct LinearGuard {
    what: &'static str,
    key: String,
    armed: bool,
}

impl LinearGuard {
    fn new(what: &'static str, key: &str) -> Self {
        Self {
            what,
            key: key.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LinearGuard {
    fn drop(&mut self) {
        if self.armed && !std::thread::panicking() {
            panic!(
                "{} for intent {} dropped before being consumed",
                self.what, self.key
            );
        }
    }
}

/// Capability to execute the actions of one intent, in order.
#[must_use = "an executable must be drained and confirmed"]
pub struct Executable<O> {
    intent: Intent<O>,
    action_idx: usize,
    execution_time: u64,
    guard: LinearGuard,
}

impl<O> Executable<O> {
    pub(crate) fn new(intent: Intent<O>, execution_time: u64) -> Self {
        let guard = LinearGuard::new("executable", intent.key());
        Self {
            intent,
            action_idx: 0,
            execution_time,
            guard,
        }
    }

    /// The intent being executed.
    pub fn intent(&self) -> &Intent<O> {
        &self.intent
    }

    /// Index of the next action to process.
    pub fn action_idx(&self) -> usize {
        self.action_idx
    }

    /// The scheduled time consumed by this execution.
    pub fn execution_time(&self) -> u64 {
        self.execution_time
    }

    /// Number of actions not processed yet.
    pub fn remaining(&self) -> usize {
        self.intent.actions_len() - self.action_idx
    }

    /// Returns true once every action was processed.
    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns true if any action of the intent has type `A`.
    pub fn contains_action<A: Any>(&self) -> bool {
        self.intent
            .actions
            .iter()
            .any(|entry| entry.downcast_ref::<A>().is_some())
    }

    /// Borrow the action at the cursor without advancing.
    ///
    /// Fails if `IW` is not the intent producer, if no action is left, or if
    /// the action has another type than `A`.
    pub fn peek_action<A, IW>(&self, _intent_witness: IW) -> Result<&A>
    where
        A: Any,
        IW: Provenance,
    {
        self.intent.assert_witness::<IW>()?;
        self.action_at::<A>(self.action_idx)
    }

    /// Borrow the action at the cursor and advance.
    ///
    /// Same checks as [`Executable::peek_action`]. The cursor only moves on
    /// success.
    pub fn next_action<A, IW>(&mut self, intent_witness: IW) -> Result<&A>
    where
        A: Any,
        IW: Provenance,
    {
        self.peek_action::<A, IW>(intent_witness)?;
        let idx = self.action_idx;
        self.action_idx += 1;
        self.action_at::<A>(idx)
    }

    fn action_at<A: Any>(&self, idx: usize) -> Result<&A> {
        self.intent
            .actions
            .get(idx)
            .ok_or(KeystoneError::NoActionLeft(idx))?
            .downcast_ref::<A>()
            .ok_or(KeystoneError::WrongActionType {
                index: idx,
                expected: type_name::<A>(),
            })
    }

    /// Split into the intent and the consumed execution time, disarming the guard.
    pub(crate) fn into_parts(self) -> (Intent<O>, usize, u64) {
        let Executable {
            intent,
            action_idx,
            execution_time,
            mut guard,
        } = self;
        guard.disarm();
        (intent, action_idx, execution_time)
    }
}

/// A confirmation refused by the registry.
///
/// When the registry did not issue the executable it is handed back untouched
/// and must still be confirmed on its own account; dropping this value with
/// the executable inside panics like dropping the executable. Otherwise the
/// intent was already restored and only the error is left.
#[derive(Error)]
#[error("{error}")]
#[must_use = "a returned executable must still be confirmed"]
pub struct Unconfirmed<O> {
    error: KeystoneError,
    executable: Option<Executable<O>>,
}

impl<O> Unconfirmed<O> {
    pub(crate) fn restored(error: KeystoneError) -> Self {
        Self {
            error,
            executable: None,
        }
    }

    pub(crate) fn returned(error: KeystoneError, executable: Executable<O>) -> Self {
        Self {
            error,
            executable: Some(executable),
        }
    }

    pub fn error(&self) -> &KeystoneError {
        &self.error
    }

    /// Returns true if the executable was handed back.
    pub fn is_returned(&self) -> bool {
        self.executable.is_some()
    }

    /// Take back the executable, if the registry did not consume it.
    pub fn into_executable(self) -> Option<Executable<O>> {
        self.executable
    }
}

impl<O> fmt::Debug for Unconfirmed<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unconfirmed")
            .field("error", &self.error)
            .field("returned", &self.is_returned())
            .finish()
    }
}

/// Capability to clean up the actions of a removed intent, in order.
#[must_use = "an expired intent must be emptied and destroyed"]
pub struct Expired {
    account: Address,
    key: String,
    confirmed_executions: usize,
    start_index: usize,
    actions: VecDeque<ActionEntry>,
    guard: LinearGuard,
}

impl Expired {
    pub(crate) fn new<O>(intent: Intent<O>) -> Self {
        let guard = LinearGuard::new("expired", intent.key());
        let account = intent.account();
        let key = intent.key().to_string();
        let confirmed_executions = intent.confirmed_executions();
        Self {
            account,
            key,
            confirmed_executions,
            start_index: 0,
            actions: intent.actions.into(),
            guard,
        }
    }

    /// Account the intent belonged to.
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Executions of the intent that processed every action.
    pub fn confirmed_executions(&self) -> usize {
        self.confirmed_executions
    }

    /// Index of the next action to remove.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Number of actions still to remove.
    pub fn remaining(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Take the next action. Fails without consuming it if it is not an `A`.
    pub fn remove_action<A: Any>(&mut self) -> Result<A> {
        let idx = self.start_index;
        let entry = self
            .actions
            .front()
            .ok_or(KeystoneError::NoActionLeft(idx))?;
        if !entry.value.is::<A>() {
            return Err(KeystoneError::WrongActionType {
                index: idx,
                expected: type_name::<A>(),
            });
        }

        let entry = self
            .actions
            .pop_front()
            .ok_or(KeystoneError::NoActionLeft(idx))?;
        let action = entry
            .value
            .downcast::<A>()
            .map_err(|_| KeystoneError::WrongActionType {
                index: idx,
                expected: type_name::<A>(),
            })?;

        self.start_index += 1;
        Ok(*action)
    }

    /// Consume the capability once every action was removed.
    ///
    /// On failure the remaining actions are dropped with it; callers treat the
    /// error as fatal to the current unit of work.
    pub fn destroy_empty(self) -> Result<()> {
        let Expired {
            actions, mut guard, ..
        } = self;
        guard.disarm();
        if actions.is_empty() {
            Ok(())
        } else {
            Err(KeystoneError::ExpiredNotEmpty(actions.len()))
        }
    }
}
