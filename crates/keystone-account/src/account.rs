//! The programmable account.
//!
//! An account aggregates its metadata, dependencies, pending intents, an
//! opaque config payload and managed storage. Privileged calls are gated by
//! provenance: a [`VersionWitness`] proving the caller package is a
//! dependency, and for config-only calls a value of the config's own witness
//! type, [`AccountConfig::Witness`].

use std::any::Any;

use keystone_core::{
    Address, Clock, Deps, Executable, Expired, Intent, Intents, KeystoneError, Metadata, ObjectId,
    Params, Provenance, Result, TypeTag, Unconfirmed, VersionWitness,
};
use keystone_state::{Asset, ManagedStorage, StoreKey};
use tracing::{debug, info};

/// Contract implemented by the config module of an account type.
///
/// Only holders of a [`AccountConfig::Witness`] value may mint [`Auth`],
/// create executables or mutate the config. Keep its fields private to the
/// config module.
pub trait AccountConfig: Send + Sync + Sized + 'static {
    /// Approval state stored in every intent of the account.
    type Outcome: Clone + Send + Sync + 'static;

    /// Witness type of the config module.
    type Witness: Provenance;

    /// Decide whether an intent with this outcome and role may execute.
    ///
    /// Called automatically before an executable is handed out.
    fn validate_outcome(&self, outcome: Self::Outcome, role: &str) -> Result<()>;
}

/// Proof that the account's config module authorized the current call.
#[derive(Debug)]
pub struct Auth {
    account_addr: Address,
}

impl Auth {
    /// Address of the account this auth was minted for.
    pub fn account_addr(&self) -> Address {
        self.account_addr
    }
}

/// Shared programmable account.
pub struct Account<C: AccountConfig> {
    addr: Address,
    metadata: Metadata,
    deps: Deps,
    intents: Intents<C::Outcome>,
    config: C,
    managed: ManagedStorage,
}

impl<C: AccountConfig> Account<C> {
    /// Create an account. Only the config module can call this.
    pub fn new<CW: Provenance>(
        config: C,
        deps: Deps,
        version_witness: VersionWitness,
        _config_witness: CW,
    ) -> Result<Self> {
        deps.check(version_witness)?;
        assert_is_config_module::<C, CW>()?;

        let addr = Address::fresh();
        info!("Created account {} with {} dependencies", addr, deps.len());
        Ok(Self {
            addr,
            metadata: Metadata::new(),
            deps,
            intents: Intents::new(addr),
            config,
            managed: ManagedStorage::new(),
        })
    }

    /// Mint an [`Auth`] for this account. Only the config module can call this.
    pub fn new_auth<CW: Provenance>(
        &self,
        version_witness: VersionWitness,
        _config_witness: CW,
    ) -> Result<Auth> {
        self.deps.check(version_witness)?;
        assert_is_config_module::<C, CW>()?;
        Ok(Auth {
            account_addr: self.addr,
        })
    }

    /// Consume an [`Auth`], asserting it was minted for this account.
    pub fn verify(&self, auth: Auth) -> Result<()> {
        if auth.account_addr != self.addr {
            return Err(KeystoneError::WrongAccount {
                expected: self.addr,
                actual: auth.account_addr,
            });
        }
        Ok(())
    }

    // === Intents ===

    /// Create an empty intent for this account, produced by the module of `IW`.
    pub fn create_intent<IW: Provenance>(
        &self,
        params: Params,
        outcome: C::Outcome,
        managed_name: &str,
        version_witness: VersionWitness,
        intent_witness: IW,
    ) -> Result<Intent<C::Outcome>> {
        self.deps.check(version_witness)?;
        Ok(Intent::new(params, outcome, managed_name, self.addr, intent_witness))
    }

    /// Queue an intent built by the module of `IW`.
    ///
    /// If the intent is refused, the objects locked for it with
    /// [`Account::lock_object_for`] are released.
    pub fn insert_intent<IW: Provenance>(
        &mut self,
        intent: Intent<C::Outcome>,
        version_witness: VersionWitness,
        _intent_witness: IW,
    ) -> Result<()> {
        let checked = self
            .deps
            .check(version_witness)
            .and_then(|_| intent.assert_witness::<IW>())
            .and_then(|_| intent.assert_is_account(self.addr));
        if let Err(err) = checked {
            self.intents.discard(intent);
            return Err(err);
        }
        self.intents.add_intent(intent)
    }

    /// Drop an intent that will not be queued, releasing the objects locked
    /// for it.
    pub fn discard_intent(
        &mut self,
        intent: Intent<C::Outcome>,
        version_witness: VersionWitness,
    ) -> Result<()> {
        self.deps.check(version_witness)?;
        debug!("Discarded intent {}", intent.key());
        self.intents.discard(intent);
        Ok(())
    }

    /// Resolve a due intent into an executable. Only the config module can call this.
    ///
    /// The outcome is validated by [`AccountConfig::validate_outcome`] first;
    /// on any failure the intent stays queued untouched.
    pub fn create_executable<CW: Provenance>(
        &mut self,
        key: &str,
        clock: &Clock,
        version_witness: VersionWitness,
        _config_witness: CW,
    ) -> Result<(C::Outcome, Executable<C::Outcome>)> {
        self.deps.check(version_witness)?;
        assert_is_config_module::<C, CW>()?;

        let intent = self.intents.get(key)?;
        self.config
            .validate_outcome(intent.outcome().clone(), intent.role())?;

        self.intents.create_executable(key, clock)
    }

    /// Return a fully processed executable, re-queuing its intent.
    ///
    /// Fails with [`KeystoneError::ActionsRemaining`] (restoring the intent)
    /// unless every action was processed. An executable issued by another
    /// account is handed back through [`Unconfirmed::into_executable`].
    pub fn confirm_execution(
        &mut self,
        executable: Executable<C::Outcome>,
    ) -> std::result::Result<(), Unconfirmed<C::Outcome>> {
        self.intents.confirm_execution(executable)
    }

    /// Remove an intent whose schedule is exhausted, for cleanup.
    pub fn destroy_empty_intent(&mut self, key: &str) -> Result<Expired> {
        self.intents.destroy_empty_intent(key)
    }

    /// Remove an intent past its expiration time, for cleanup.
    pub fn delete_expired_intent(&mut self, key: &str, clock: &Clock) -> Result<Expired> {
        self.intents.delete_expired_intent(key, clock)
    }

    /// Mutable outcome of a pending intent, used to record approvals.
    /// Only the config module can call this.
    pub fn outcome_mut<CW: Provenance>(
        &mut self,
        key: &str,
        version_witness: VersionWitness,
        _config_witness: CW,
    ) -> Result<&mut C::Outcome> {
        self.deps.check(version_witness)?;
        assert_is_config_module::<C, CW>()?;
        Ok(self.intents.get_mut(key)?.outcome_mut())
    }

    /// Mutable registry, for config modules managing votes in bulk.
    /// Only the config module can call this.
    pub fn intents_mut<CW: Provenance>(
        &mut self,
        version_witness: VersionWitness,
        _config_witness: CW,
    ) -> Result<&mut Intents<C::Outcome>> {
        self.deps.check(version_witness)?;
        assert_is_config_module::<C, CW>()?;
        Ok(&mut self.intents)
    }

    // === Locks ===

    /// Reserve an object for a pending intent.
    pub fn lock_object(&mut self, id: ObjectId, version_witness: VersionWitness) -> Result<()> {
        self.deps.check(version_witness)?;
        self.intents.lock(id)
    }

    /// Reserve an object for an intent that is not queued yet.
    ///
    /// The lock follows the intent: it is released if the intent is
    /// discarded or refused on insertion.
    pub fn lock_object_for(
        &mut self,
        intent: &mut Intent<C::Outcome>,
        id: ObjectId,
        version_witness: VersionWitness,
    ) -> Result<()> {
        self.deps.check(version_witness)?;
        self.intents.lock_for(intent, id)
    }

    /// Release an object reserved by an intent.
    pub fn unlock_object(&mut self, id: ObjectId, version_witness: VersionWitness) -> Result<()> {
        self.deps.check(version_witness)?;
        self.intents.unlock(id)
    }

    // === Config ===

    /// Mutable config. Only the config module can call this.
    pub fn config_mut<CW: Provenance>(
        &mut self,
        version_witness: VersionWitness,
        _config_witness: CW,
    ) -> Result<&mut C> {
        self.deps.check(version_witness)?;
        assert_is_config_module::<C, CW>()?;
        Ok(&mut self.config)
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub(crate) fn deps_mut(&mut self) -> &mut Deps {
        &mut self.deps
    }

    // === Managed data ===

    pub fn add_managed_data<K: StoreKey, V: Any + Send + Sync>(
        &mut self,
        key: K,
        data: V,
        version_witness: VersionWitness,
    ) -> Result<()> {
        self.deps.check(version_witness)?;
        self.managed.add_data(key, data)
    }

    pub fn has_managed_data<K: StoreKey>(&self, key: &K) -> bool {
        self.managed.has_data(key)
    }

    pub fn borrow_managed_data<K: StoreKey, V: Any>(&self, key: &K) -> Result<&V> {
        self.managed.borrow_data(key)
    }

    pub fn borrow_managed_data_mut<K: StoreKey, V: Any>(
        &mut self,
        key: &K,
        version_witness: VersionWitness,
    ) -> Result<&mut V> {
        self.deps.check(version_witness)?;
        self.managed.borrow_data_mut(key)
    }

    pub fn remove_managed_data<K: StoreKey, V: Any>(
        &mut self,
        key: &K,
        version_witness: VersionWitness,
    ) -> Result<V> {
        self.deps.check(version_witness)?;
        self.managed.remove_data(key)
    }

    // === Managed assets ===

    pub fn add_managed_asset<K: StoreKey, A: Asset>(
        &mut self,
        key: K,
        asset: A,
        version_witness: VersionWitness,
    ) -> Result<()> {
        self.deps.check(version_witness)?;
        self.managed.add_asset(key, asset)
    }

    pub fn has_managed_asset<K: StoreKey>(&self, key: &K) -> bool {
        self.managed.has_asset(key)
    }

    pub fn borrow_managed_asset<K: StoreKey, A: Asset>(&self, key: &K) -> Result<&A> {
        self.managed.borrow_asset(key)
    }

    pub fn borrow_managed_asset_mut<K: StoreKey, A: Asset>(
        &mut self,
        key: &K,
        version_witness: VersionWitness,
    ) -> Result<&mut A> {
        self.deps.check(version_witness)?;
        self.managed.borrow_asset_mut(key)
    }

    pub fn remove_managed_asset<K: StoreKey, A: Asset>(
        &mut self,
        key: &K,
        version_witness: VersionWitness,
    ) -> Result<A> {
        self.deps.check(version_witness)?;
        self.managed.remove_asset(key)
    }

    // === View ===

    pub fn addr(&self) -> Address {
        self.addr
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn deps(&self) -> &Deps {
        &self.deps
    }

    pub fn intents(&self) -> &Intents<C::Outcome> {
        &self.intents
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

/// Assert `CW` is the witness type of the config `C`.
fn assert_is_config_module<C: AccountConfig, CW: Provenance>() -> Result<()> {
    let expected = TypeTag::of::<C::Witness>();
    let witness = TypeTag::of::<CW>();
    if witness != expected {
        return Err(KeystoneError::NotConfigModule {
            expected: expected.to_string(),
            actual: witness.to_string(),
        });
    }
    debug!("Config module call from {}", witness);
    Ok(())
}
