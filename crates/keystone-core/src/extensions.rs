//! Whitelist of verified packages and their version history.
//!
//! Account dependencies are checked against this registry unless the account
//! allows unverified dependencies. Every published version records the tag of
//! the version witness type it was registered with.

use tracing::info;

use crate::error::{KeystoneError, Result};
use crate::provenance::{TypeTag, VersionWitness};
use crate::types::Address;

/// Name of the core engine package, always the first dependency.
pub const CORE_DEP_NAME: &str = "KeystoneProtocol";

/// One published version of an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    pub addr: Address,
    pub version: u64,
    pub witness: TypeTag,
}

impl History {
    fn new(witness: VersionWitness, version: u64) -> Self {
        Self {
            addr: witness.package_addr(),
            version,
            witness: witness.type_tag(),
        }
    }
}

/// A whitelisted package with all its published versions, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub name: String,
    pub history: Vec<History>,
}

impl Extension {
    /// Latest published version.
    pub fn latest(&self) -> Option<&History> {
        self.history.last()
    }
}

/// The extension whitelist.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    inner: Vec<Extension>,
}

impl Extensions {
    /// Create a whitelist seeded with the core engine package.
    pub fn new(core: VersionWitness, core_version: u64) -> Self {
        Self {
            inner: vec![Extension {
                name: CORE_DEP_NAME.to_string(),
                history: vec![History::new(core, core_version)],
            }],
        }
    }

    /// Number of whitelisted packages.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// All whitelisted packages.
    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.inner.iter()
    }

    /// Get an extension by name.
    pub fn get(&self, name: &str) -> Option<&Extension> {
        self.inner.iter().find(|ext| ext.name == name)
    }

    /// Latest (address, version) published under `name`.
    pub fn latest(&self, name: &str) -> Result<(Address, u64)> {
        self.get(name)
            .and_then(Extension::latest)
            .map(|h| (h.addr, h.version))
            .ok_or_else(|| KeystoneError::ExtensionNotFound(name.to_string()))
    }

    /// The published entry for this exact (name, address, version).
    pub fn history(&self, name: &str, addr: Address, version: u64) -> Option<&History> {
        self.get(name)?
            .history
            .iter()
            .find(|h| h.addr == addr && h.version == version)
    }

    /// Returns true if this exact (name, address, version) was ever published.
    pub fn is_extension(&self, name: &str, addr: Address, version: u64) -> bool {
        self.history(name, addr, version).is_some()
    }

    /// Returns true if any version of any package was published at `addr`.
    pub fn contains_addr(&self, addr: Address) -> bool {
        self.published().any(|h| h.addr == addr)
    }

    /// Returns true if any version was registered with this witness type.
    pub fn contains_witness(&self, witness: TypeTag) -> bool {
        self.published().any(|h| h.witness == witness)
    }

    fn published(&self) -> impl Iterator<Item = &History> {
        self.inner.iter().flat_map(|ext| ext.history.iter())
    }

    fn assert_unpublished(&self, witness: VersionWitness) -> Result<()> {
        let addr = witness.package_addr();
        if self.contains_addr(addr) || self.contains_witness(witness.type_tag()) {
            return Err(KeystoneError::ExtensionAlreadyExists(addr.to_string()));
        }
        Ok(())
    }

    /// Whitelist a new package, published by the holder of `witness`.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        witness: VersionWitness,
        version: u64,
    ) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(KeystoneError::ExtensionAlreadyExists(name));
        }
        self.assert_unpublished(witness)?;

        info!(
            "Whitelisted extension {} v{} at {} ({})",
            name,
            version,
            witness.package_addr(),
            witness.type_tag()
        );
        self.inner.push(Extension {
            name,
            history: vec![History::new(witness, version)],
        });
        Ok(())
    }

    /// Publish a new version of a whitelisted package.
    pub fn update(&mut self, name: &str, witness: VersionWitness, version: u64) -> Result<()> {
        self.assert_unpublished(witness)?;
        let ext = self
            .inner
            .iter_mut()
            .find(|ext| ext.name == name)
            .ok_or_else(|| KeystoneError::ExtensionNotFound(name.to_string()))?;

        let latest = ext.latest().map_or(0, |h| h.version);
        if version <= latest {
            return Err(KeystoneError::ExtensionVersionNotNewer {
                name: name.to_string(),
                version,
                latest,
            });
        }

        info!(
            "Updated extension {} to v{} at {}",
            name,
            version,
            witness.package_addr()
        );
        ext.history.push(History::new(witness, version));
        Ok(())
    }

    /// Remove a package from the whitelist.
    pub fn remove(&mut self, name: &str) -> Result<Extension> {
        if name == CORE_DEP_NAME {
            return Err(KeystoneError::CannotRemoveCore);
        }
        let idx = self
            .inner
            .iter()
            .position(|ext| ext.name == name)
            .ok_or_else(|| KeystoneError::ExtensionNotFound(name.to_string()))?;

        info!("Removed extension {}", name);
        Ok(self.inner.remove(idx))
    }
}
