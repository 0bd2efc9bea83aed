//! Intent registry and resource lock set of one account.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::error::{KeystoneError, Result};
use crate::executable::{Executable, Expired, Unconfirmed};
use crate::intent::Intent;
use crate::types::{Address, Clock, ObjectId};

/// Pending intents keyed by their unique key, plus locked objects.
pub struct Intents<O> {
    account: Address,
    inner: BTreeMap<String, Intent<O>>,
    /// Keys whose intent is currently held by an executable.
    in_flight: BTreeSet<String>,
    locked: BTreeSet<ObjectId>,
}

impl<O> Intents<O> {
    /// Create an empty registry for `account`.
    pub fn new(account: Address) -> Self {
        Self {
            account,
            inner: BTreeMap::new(),
            in_flight: BTreeSet::new(),
            locked: BTreeSet::new(),
        }
    }

    /// Account the registry belongs to.
    pub fn account(&self) -> Address {
        self.account
    }

    /// Number of queued intents.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns true if a queued intent has this key.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Keys of queued intents, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Result<&Intent<O>> {
        self.inner
            .get(key)
            .ok_or_else(|| KeystoneError::KeyDoesntExist(key.to_string()))
    }

    pub fn get_mut(&mut self, key: &str) -> Result<&mut Intent<O>> {
        self.inner
            .get_mut(key)
            .ok_or_else(|| KeystoneError::KeyDoesntExist(key.to_string()))
    }

    /// Assert no queued or executing intent uses `key`.
    pub fn assert_key_available(&self, key: &str) -> Result<()> {
        if self.inner.contains_key(key) || self.in_flight.contains(key) {
            return Err(KeystoneError::KeyAlreadyExists(key.to_string()));
        }
        Ok(())
    }

    /// Queue an intent. Keys of queued or executing intents are taken.
    ///
    /// On failure the objects the intent locked while it was built are
    /// released.
    pub fn add_intent(&mut self, mut intent: Intent<O>) -> Result<()> {
        intent.assert_is_account(self.account)?;
        if let Err(err) = self.assert_key_available(intent.key()) {
            self.discard(intent);
            return Err(err);
        }
        intent.take_pending_locks();

        let key = intent.key();
        info!(
            "Queued intent {} ({} actions, {} executions)",
            key,
            intent.actions_len(),
            intent.execution_times().len()
        );
        self.inner.insert(key.to_string(), intent);
        Ok(())
    }

    /// Remove a queued intent.
    pub(crate) fn remove_intent(&mut self, key: &str) -> Result<Intent<O>> {
        self.inner
            .remove(key)
            .ok_or_else(|| KeystoneError::KeyDoesntExist(key.to_string()))
    }

    /// Objects currently reserved by pending intents.
    pub fn locked(&self) -> &BTreeSet<ObjectId> {
        &self.locked
    }

    pub fn is_locked(&self, id: ObjectId) -> bool {
        self.locked.contains(&id)
    }

    /// Reserve an object for a pending intent.
    pub fn lock(&mut self, id: ObjectId) -> Result<()> {
        if !self.locked.insert(id) {
            return Err(KeystoneError::ObjectAlreadyLocked(id));
        }
        debug!("Locked object {}", id);
        Ok(())
    }

    /// Release a reserved object.
    pub fn unlock(&mut self, id: ObjectId) -> Result<()> {
        if !self.locked.remove(&id) {
            return Err(KeystoneError::ObjectNotLocked(id));
        }
        debug!("Unlocked object {}", id);
        Ok(())
    }

    /// Reserve an object for an intent that is not queued yet.
    ///
    /// The lock is recorded on the intent and released again if the intent
    /// is discarded or rejected by [`Intents::add_intent`].
    pub fn lock_for(&mut self, intent: &mut Intent<O>, id: ObjectId) -> Result<()> {
        intent.assert_is_account(self.account)?;
        self.lock(id)?;
        intent.record_lock(id);
        Ok(())
    }

    /// Drop an intent that will not be queued, releasing its pending locks.
    pub fn discard(&mut self, mut intent: Intent<O>) {
        if intent.account() != self.account {
            return;
        }
        for id in intent.take_pending_locks() {
            if self.locked.remove(&id) {
                debug!("Released object {} of discarded intent {}", id, intent.key());
            }
        }
    }

    /// Take a due intent out of the queue and wrap it in an executable.
    ///
    /// Pops the earliest execution time; fails and leaves the intent queued if
    /// that time is still in the future. Returns a copy of the outcome so the
    /// caller can validate it.
    pub fn create_executable(&mut self, key: &str, clock: &Clock) -> Result<(O, Executable<O>)>
    where
        O: Clone,
    {
        let now = clock.timestamp_ms();
        let intent = self.get(key)?;
        let execution_time = match intent.execution_times().front() {
            Some(&time) if time <= now => time,
            Some(&time) => {
                return Err(KeystoneError::CantBeExecutedYet {
                    key: key.to_string(),
                    execution_time: time,
                    now,
                })
            }
            // An exhausted schedule never becomes due.
            None => {
                return Err(KeystoneError::CantBeExecutedYet {
                    key: key.to_string(),
                    execution_time: u64::MAX,
                    now,
                })
            }
        };

        let mut intent = self.remove_intent(key)?;
        intent.pop_front_execution_time();
        self.in_flight.insert(key.to_string());

        info!("Issued executable for intent {} at {}", key, execution_time);
        let outcome = intent.outcome().clone();
        Ok((outcome, Executable::new(intent, execution_time)))
    }

    /// Return an executed intent to the queue.
    ///
    /// Fails unless every action was processed; the intent is then restored
    /// with its execution time so nothing changed. An executable this
    /// registry did not issue is handed back inside the error, untouched.
    pub fn confirm_execution(
        &mut self,
        executable: Executable<O>,
    ) -> std::result::Result<(), Unconfirmed<O>> {
        if let Err(err) = executable.intent().assert_is_account(self.account) {
            warn!(
                "Refused executable for intent {} from another account",
                executable.intent().key()
            );
            return Err(Unconfirmed::returned(err, executable));
        }
        let key = executable.intent().key().to_string();
        if !self.in_flight.remove(&key) {
            return Err(Unconfirmed::returned(
                KeystoneError::KeyDoesntExist(key),
                executable,
            ));
        }

        let (mut intent, action_idx, execution_time) = executable.into_parts();
        let remaining = intent.actions_len() - action_idx;
        if remaining > 0 {
            intent.push_front_execution_time(execution_time);
            self.inner.insert(key.clone(), intent);
            warn!("Intent {} confirmed with {} actions remaining", key, remaining);
            return Err(Unconfirmed::restored(KeystoneError::ActionsRemaining {
                key,
                remaining,
            }));
        }

        intent.record_confirmed_execution();
        info!(
            "Confirmed execution of intent {}, {} executions left",
            key,
            intent.execution_times().len()
        );
        self.inner.insert(key, intent);
        Ok(())
    }

    /// Remove an intent whose schedule is exhausted.
    pub fn destroy_empty_intent(&mut self, key: &str) -> Result<Expired> {
        let remaining = self.get(key)?.execution_times().len();
        if remaining > 0 {
            return Err(KeystoneError::CantBeRemovedYet {
                key: key.to_string(),
                remaining,
            });
        }

        let intent = self.remove_intent(key)?;
        info!("Destroyed executed intent {}", key);
        Ok(Expired::new(intent))
    }

    /// Remove an intent past its expiration time, executed or not.
    pub fn delete_expired_intent(&mut self, key: &str, clock: &Clock) -> Result<Expired> {
        let now = clock.timestamp_ms();
        let expiration_time = self.get(key)?.expiration_time();
        if now < expiration_time {
            return Err(KeystoneError::HasntExpired {
                key: key.to_string(),
                expiration_time,
                now,
            });
        }

        let intent = self.remove_intent(key)?;
        info!("Deleted expired intent {}", key);
        Ok(Expired::new(intent))
    }
}
