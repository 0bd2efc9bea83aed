//! Typed key-value store.
//!
//! Values of any type are stored under keys of any type. Entries are grouped
//! per key type, so two modules using distinct key types can never collide
//! even when their key values are equal.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use keystone_core::{KeystoneError, Result};

/// Bound for store keys.
pub trait StoreKey: Hash + Eq + Debug + Send + Sync + 'static {}

impl<T: Hash + Eq + Debug + Send + Sync + 'static> StoreKey for T {}

type Slot<K> = HashMap<K, Box<dyn Any + Send + Sync>>;

/// In-memory typed store.
#[derive(Default)]
pub struct TypedStore {
    /// Key type -> `Slot<K>` for that key type.
    slots: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    /// Label used in error messages ("data", "asset").
    kind: &'static str,
    entries: usize,
}

impl TypedStore {
    /// Create an empty store labelled `kind`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            slots: HashMap::new(),
            kind,
            entries: 0,
        }
    }

    fn slot<K: StoreKey>(&self) -> Option<&Slot<K>> {
        self.slots
            .get(&TypeId::of::<K>())
            .and_then(|slot| slot.downcast_ref::<Slot<K>>())
    }

    fn slot_mut<K: StoreKey>(&mut self) -> Option<&mut Slot<K>> {
        self.slots
            .get_mut(&TypeId::of::<K>())
            .and_then(|slot| slot.downcast_mut::<Slot<K>>())
    }

    fn slot_or_insert<K: StoreKey>(&mut self) -> Option<&mut Slot<K>> {
        self.slots
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(Slot::<K>::new()))
            .downcast_mut::<Slot<K>>()
    }

    fn already_exists<K: StoreKey>(&self, key: &K) -> KeystoneError {
        KeystoneError::AlreadyExists {
            kind: self.kind,
            key: format!("{:?}", key),
        }
    }

    fn doesnt_exist<K: StoreKey>(&self, key: &K) -> KeystoneError {
        KeystoneError::DoesntExist {
            kind: self.kind,
            key: format!("{:?}", key),
        }
    }

    /// Total number of entries across key types.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Insert a value. Fails if the key is taken.
    pub fn add<K: StoreKey, V: Any + Send + Sync>(&mut self, key: K, value: V) -> Result<()> {
        if self.has(&key) {
            return Err(self.already_exists(&key));
        }
        let kind = self.kind;
        let slot = self
            .slot_or_insert::<K>()
            .ok_or_else(|| KeystoneError::AlreadyExists {
                kind,
                key: type_name::<K>().to_string(),
            })?;
        slot.insert(key, Box::new(value));
        self.entries += 1;
        Ok(())
    }

    /// Returns true if a value is stored under the key.
    pub fn has<K: StoreKey>(&self, key: &K) -> bool {
        self.slot::<K>().map_or(false, |slot| slot.contains_key(key))
    }

    /// Borrow the value under the key as a `V`.
    pub fn borrow<K: StoreKey, V: Any>(&self, key: &K) -> Result<&V> {
        self.slot::<K>()
            .and_then(|slot| slot.get(key))
            .and_then(|value| value.downcast_ref::<V>())
            .ok_or_else(|| self.doesnt_exist(key))
    }

    /// Mutably borrow the value under the key as a `V`.
    pub fn borrow_mut<K: StoreKey, V: Any>(&mut self, key: &K) -> Result<&mut V> {
        let err = self.doesnt_exist(key);
        self.slot_mut::<K>()
            .and_then(|slot| slot.get_mut(key))
            .and_then(|value| value.downcast_mut::<V>())
            .ok_or(err)
    }

    /// Remove and return the value under the key.
    pub fn remove<K: StoreKey, V: Any>(&mut self, key: &K) -> Result<V> {
        // Check the type first so a mismatch leaves the entry in place.
        self.borrow::<K, V>(key)?;
        let err = self.doesnt_exist(key);
        let value = self
            .slot_mut::<K>()
            .and_then(|slot| slot.remove(key))
            .ok_or_else(|| err.clone())?;
        self.entries -= 1;
        value.downcast::<V>().map(|value| *value).map_err(|_| err)
    }
}
