//! Intent types and params for the Keystone engine.
//!
//! An Intent is a proposed multi-step operation: a fixed, ordered list of
//! typed actions plus a schedule and an approval outcome.

use std::any::{type_name, Any};
use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{KeystoneError, Result};
use crate::provenance::{new_role, Provenance, TypeTag};
use crate::types::{Address, Clock, ObjectId};

/// Validated parameters shared by every intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    key: String,
    description: String,
    creator: Address,
    creation_time: u64,
    execution_times: Vec<u64>,
    expiration_time: u64,
}

impl Params {
    /// Create params. The schedule must be non-empty and strictly ascending.
    pub fn new(
        key: impl Into<String>,
        description: impl Into<String>,
        execution_times: Vec<u64>,
        expiration_time: u64,
        clock: &Clock,
        creator: Address,
    ) -> Result<Self> {
        if execution_times.is_empty() {
            return Err(KeystoneError::NoExecutionTime);
        }
        if execution_times.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(KeystoneError::ExecutionTimesNotAscending);
        }

        Ok(Self {
            key: key.into(),
            description: description.into(),
            creator,
            creation_time: clock.timestamp_ms(),
            execution_times,
            expiration_time,
        })
    }

    /// Create params under a random unique key.
    pub fn new_with_rand_key(
        description: impl Into<String>,
        execution_times: Vec<u64>,
        expiration_time: u64,
        clock: &Clock,
        creator: Address,
    ) -> Result<Self> {
        Self::new(
            Uuid::new_v4().to_string(),
            description,
            execution_times,
            expiration_time,
            clock,
            creator,
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn creator(&self) -> Address {
        self.creator
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn execution_times(&self) -> &[u64] {
        &self.execution_times
    }

    pub fn expiration_time(&self) -> u64 {
        self.expiration_time
    }
}

/// One typed action stored in an intent.
pub(crate) struct ActionEntry {
    pub(crate) type_name: &'static str,
    pub(crate) value: Box<dyn Any + Send + Sync>,
}

impl ActionEntry {
    fn new<A: Any + Send + Sync>(action: A) -> Self {
        Self {
            type_name: type_name::<A>(),
            value: Box::new(action),
        }
    }

    pub(crate) fn downcast_ref<A: Any>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }
}

/// A proposed multi-step operation awaiting execution.
pub struct Intent<O> {
    type_: TypeTag,
    key: String,
    description: String,
    account: Address,
    creator: Address,
    creation_time: u64,
    execution_times: VecDeque<u64>,
    expiration_time: u64,
    role: String,
    pub(crate) actions: Vec<ActionEntry>,
    /// Objects locked while the intent was built, until it is queued.
    pending_locks: Vec<ObjectId>,
    confirmed_executions: usize,
    outcome: O,
}

impl<O> Intent<O> {
    /// Create an empty intent produced by the module defining `IW`.
    ///
    /// Only that module can construct the witness, so the recorded producer
    /// cannot be forged.
    pub fn new<IW: Provenance>(
        params: Params,
        outcome: O,
        managed_name: &str,
        account: Address,
        _intent_witness: IW,
    ) -> Self {
        Self {
            type_: TypeTag::of::<IW>(),
            key: params.key,
            description: params.description,
            account,
            creator: params.creator,
            creation_time: params.creation_time,
            execution_times: params.execution_times.into(),
            expiration_time: params.expiration_time,
            role: new_role::<IW>(managed_name),
            actions: Vec::new(),
            pending_locks: Vec::new(),
            confirmed_executions: 0,
            outcome,
        }
    }

    /// Append an action. Actions run in the order they were added.
    pub fn add_action<A, IW>(&mut self, action: A, _intent_witness: IW) -> Result<()>
    where
        A: Any + Send + Sync,
        IW: Provenance,
    {
        self.assert_witness::<IW>()?;
        self.actions.push(ActionEntry::new(action));
        Ok(())
    }

    /// Assert the intent was produced by the module defining `IW`.
    pub fn assert_witness<IW: Provenance>(&self) -> Result<()> {
        let actual = TypeTag::of::<IW>();
        if actual == self.type_ {
            Ok(())
        } else {
            Err(KeystoneError::WrongWitness {
                expected: self.type_.to_string(),
                actual: actual.to_string(),
            })
        }
    }

    /// Assert the intent belongs to `account`.
    pub fn assert_is_account(&self, account: Address) -> Result<()> {
        if self.account == account {
            Ok(())
        } else {
            Err(KeystoneError::WrongAccount {
                expected: account,
                actual: self.account,
            })
        }
    }

    /// Assert the intent is scheduled exactly once.
    pub fn assert_single_execution(&self) -> Result<()> {
        match self.execution_times.len() {
            1 => Ok(()),
            n => Err(KeystoneError::SingleExecution(n)),
        }
    }

    pub(crate) fn pop_front_execution_time(&mut self) -> Option<u64> {
        self.execution_times.pop_front()
    }

    pub(crate) fn push_front_execution_time(&mut self, time: u64) {
        self.execution_times.push_front(time);
    }

    pub(crate) fn record_confirmed_execution(&mut self) {
        self.confirmed_executions += 1;
    }

    /// Number of executions confirmed with every action processed.
    pub fn confirmed_executions(&self) -> usize {
        self.confirmed_executions
    }

    pub(crate) fn record_lock(&mut self, id: ObjectId) {
        self.pending_locks.push(id);
    }

    pub(crate) fn take_pending_locks(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.pending_locks)
    }

    /// Objects locked for this intent that it still holds as a proposal.
    ///
    /// Emptied once the intent is queued; from then on its actions own them.
    pub fn pending_locks(&self) -> &[ObjectId] {
        &self.pending_locks
    }

    pub fn type_(&self) -> &TypeTag {
        &self.type_
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn creator(&self) -> Address {
        self.creator
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn execution_times(&self) -> &VecDeque<u64> {
        &self.execution_times
    }

    pub fn expiration_time(&self) -> u64 {
        self.expiration_time
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Number of actions.
    pub fn actions_len(&self) -> usize {
        self.actions.len()
    }

    /// Type names of the actions, in execution order.
    pub fn action_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.iter().map(|entry| entry.type_name)
    }

    pub fn outcome(&self) -> &O {
        &self.outcome
    }

    /// Mutable outcome, used to accumulate approvals before execution.
    pub fn outcome_mut(&mut self) -> &mut O {
        &mut self.outcome
    }
}

impl<O: fmt::Debug> fmt::Debug for Intent<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intent")
            .field("type_", &self.type_.to_string())
            .field("key", &self.key)
            .field("account", &self.account)
            .field("execution_times", &self.execution_times)
            .field("expiration_time", &self.expiration_time)
            .field("role", &self.role)
            .field("actions", &self.action_types().collect::<Vec<_>>())
            .field("pending_locks", &self.pending_locks)
            .field("outcome", &self.outcome)
            .finish()
    }
}
