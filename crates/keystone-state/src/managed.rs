//! Managed storage attached to an account.
//!
//! Extensions keep their per-account state here. Opaque data and owned
//! assets live in separate namespaces. Access control (the dependency check)
//! is enforced by the account before it reaches this layer.

use std::any::Any;

use keystone_core::{ObjectId, Result};
use tracing::debug;

use crate::store::{StoreKey, TypedStore};

/// An object whose ownership can be transferred to and from an account.
pub trait Asset: Any + Send + Sync {
    /// Identifier of the object.
    fn id(&self) -> ObjectId;
}

/// Data and asset namespaces of one account.
pub struct ManagedStorage {
    data: TypedStore,
    assets: TypedStore,
}

impl ManagedStorage {
    /// Create empty managed storage.
    pub fn new() -> Self {
        Self {
            data: TypedStore::new("data"),
            assets: TypedStore::new("asset"),
        }
    }

    /// Number of data entries.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Number of held assets.
    pub fn assets_len(&self) -> usize {
        self.assets.len()
    }

    pub fn add_data<K: StoreKey, V: Any + Send + Sync>(&mut self, key: K, value: V) -> Result<()> {
        debug!("Adding managed data {:?}", key);
        self.data.add(key, value)
    }

    pub fn has_data<K: StoreKey>(&self, key: &K) -> bool {
        self.data.has(key)
    }

    pub fn borrow_data<K: StoreKey, V: Any>(&self, key: &K) -> Result<&V> {
        self.data.borrow(key)
    }

    pub fn borrow_data_mut<K: StoreKey, V: Any>(&mut self, key: &K) -> Result<&mut V> {
        self.data.borrow_mut(key)
    }

    pub fn remove_data<K: StoreKey, V: Any>(&mut self, key: &K) -> Result<V> {
        debug!("Removing managed data {:?}", key);
        self.data.remove(key)
    }

    pub fn add_asset<K: StoreKey, A: Asset>(&mut self, key: K, asset: A) -> Result<()> {
        debug!("Adding managed asset {:?} ({})", key, asset.id());
        self.assets.add(key, asset)
    }

    pub fn has_asset<K: StoreKey>(&self, key: &K) -> bool {
        self.assets.has(key)
    }

    pub fn borrow_asset<K: StoreKey, A: Asset>(&self, key: &K) -> Result<&A> {
        self.assets.borrow(key)
    }

    pub fn borrow_asset_mut<K: StoreKey, A: Asset>(&mut self, key: &K) -> Result<&mut A> {
        self.assets.borrow_mut(key)
    }

    pub fn remove_asset<K: StoreKey, A: Asset>(&mut self, key: &K) -> Result<A> {
        let asset = self.assets.remove::<K, A>(key)?;
        debug!("Removed managed asset {:?} ({})", key, asset.id());
        Ok(asset)
    }
}

impl Default for ManagedStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_core::KeystoneError;

    #[derive(Debug, Hash, PartialEq, Eq)]
    struct TreasuryKey(&'static str);

    struct Cap {
        id: ObjectId,
    }

    impl Asset for Cap {
        fn id(&self) -> ObjectId {
            self.id
        }
    }

    #[test]
    fn test_data_and_assets_are_separate() {
        let mut storage = ManagedStorage::new();
        let id = ObjectId::new();

        storage.add_data(TreasuryKey("main"), 100u64).unwrap();
        storage.add_asset(TreasuryKey("main"), Cap { id }).unwrap();

        assert_eq!(*storage.borrow_data::<_, u64>(&TreasuryKey("main")).unwrap(), 100);
        assert_eq!(storage.borrow_asset::<_, Cap>(&TreasuryKey("main")).unwrap().id(), id);
        assert_eq!(storage.data_len(), 1);
        assert_eq!(storage.assets_len(), 1);

        let cap = storage.remove_asset::<_, Cap>(&TreasuryKey("main")).unwrap();
        assert_eq!(cap.id(), id);
        assert!(!storage.has_asset(&TreasuryKey("main")));
        assert!(storage.has_data(&TreasuryKey("main")));
    }

    #[test]
    fn test_missing_asset() {
        let mut storage = ManagedStorage::new();
        assert!(matches!(
            storage.remove_asset::<_, Cap>(&TreasuryKey("none")),
            Err(KeystoneError::DoesntExist { kind: "asset", .. })
        ));
    }
}
