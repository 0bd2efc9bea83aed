//! Account dependencies.
//!
//! [`Deps`] lists the packages allowed to act on an account. Entry 0 is
//! always the core engine; entry 1, when present, is the config extension.
//! Every privileged operation calls [`Deps::check`] with the caller's
//! [`VersionWitness`], which must match the witness type bound to the pin.

use tracing::debug;

use crate::error::{KeystoneError, Result};
use crate::extensions::{Extension, Extensions, History, CORE_DEP_NAME};
use crate::provenance::{TypeTag, VersionWitness};
use crate::types::Address;

/// A package pinned at a given version.
///
/// Whitelisted pins take their witness type from the whitelist. Unverified
/// pins are bound only when built with [`Dependency::bound`]; an unbound pin
/// never passes [`Deps::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub addr: Address,
    pub version: u64,
    witness: Option<TypeTag>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, addr: Address, version: u64) -> Self {
        Self {
            name: name.into(),
            addr,
            version,
            witness: None,
        }
    }

    /// Pin the package that minted `witness`.
    pub fn bound(name: impl Into<String>, witness: VersionWitness, version: u64) -> Self {
        Self {
            name: name.into(),
            addr: witness.package_addr(),
            version,
            witness: Some(witness.type_tag()),
        }
    }

    fn from_history(name: impl Into<String>, history: &History) -> Self {
        Self {
            name: name.into(),
            addr: history.addr,
            version: history.version,
            witness: Some(history.witness),
        }
    }

    /// Witness type bound to this pin, if any.
    pub fn witness(&self) -> Option<TypeTag> {
        self.witness
    }
}

/// Ordered, deduplicated list of dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deps {
    inner: Vec<Dependency>,
    unverified_allowed: bool,
}

impl Deps {
    /// Build and validate a dependency list from parallel vectors.
    ///
    /// Entries that are not whitelisted stay unbound; use
    /// [`Deps::from_entries`] with [`Dependency::bound`] to pin them usable.
    pub fn new(
        extensions: &Extensions,
        unverified_allowed: bool,
        names: Vec<String>,
        addresses: Vec<Address>,
        versions: Vec<u64>,
    ) -> Result<Self> {
        if names.len() != addresses.len() || addresses.len() != versions.len() {
            return Err(KeystoneError::DepsNotSameLength);
        }

        let entries = names
            .into_iter()
            .zip(addresses)
            .zip(versions)
            .map(|((name, addr), version)| Dependency::new(name, addr, version))
            .collect();

        Self::from_entries(extensions, unverified_allowed, entries)
    }

    /// Build and validate a dependency list.
    pub fn from_entries(
        extensions: &Extensions,
        unverified_allowed: bool,
        entries: Vec<Dependency>,
    ) -> Result<Self> {
        let core = entries
            .first()
            .ok_or(KeystoneError::CoreDepMissing(CORE_DEP_NAME))?;
        if core.name != CORE_DEP_NAME
            || !extensions.is_extension(&core.name, core.addr, core.version)
        {
            return Err(KeystoneError::CoreDepMissing(CORE_DEP_NAME));
        }

        let mut deps = Self {
            inner: Vec::with_capacity(entries.len()),
            unverified_allowed,
        };

        for (idx, mut dep) in entries.into_iter().enumerate() {
            match extensions.history(&dep.name, dep.addr, dep.version) {
                Some(history) => dep.witness = Some(history.witness),
                // The config extension is always verified, the rest only when required.
                None if idx == 1 || !unverified_allowed => {
                    return Err(KeystoneError::NotExtension {
                        name: dep.name,
                        addr: dep.addr,
                        version: dep.version,
                    });
                }
                None => {}
            }
            deps.push(dep)?;
        }

        Ok(deps)
    }

    /// Pin each named whitelisted package at its latest version.
    ///
    /// The first name must be the core engine. Unverified dependencies are
    /// not allowed in the result.
    pub fn new_latest_from_whitelist(extensions: &Extensions, names: &[&str]) -> Result<Self> {
        if names.first() != Some(&CORE_DEP_NAME) {
            return Err(KeystoneError::CoreDepMissing(CORE_DEP_NAME));
        }

        let mut deps = Self {
            inner: Vec::with_capacity(names.len()),
            unverified_allowed: false,
        };
        for name in names {
            let latest = extensions
                .get(name)
                .and_then(Extension::latest)
                .ok_or_else(|| KeystoneError::NotExtension {
                    name: name.to_string(),
                    addr: Address::ZERO,
                    version: 0,
                })?;
            deps.push(Dependency::from_history(*name, latest))?;
        }

        Ok(deps)
    }

    fn push(&mut self, dep: Dependency) -> Result<()> {
        if self.contains_name(&dep.name) {
            return Err(KeystoneError::DepAlreadyExists(dep.name));
        }
        if self.contains_addr(dep.addr) {
            return Err(KeystoneError::DepAlreadyExists(dep.addr.to_string()));
        }
        self.inner.push(dep);
        Ok(())
    }

    /// Move every whitelisted pin to the latest published version.
    ///
    /// Pins that are not whitelisted (unverified packages) are left untouched.
    pub fn update_to_latest(&mut self, extensions: &Extensions) {
        for dep in self.inner.iter_mut() {
            if !extensions.is_extension(&dep.name, dep.addr, dep.version) {
                continue;
            }
            if let Some(latest) = extensions.get(&dep.name).and_then(Extension::latest) {
                if latest.version != dep.version {
                    debug!("Dependency {} v{} -> v{}", dep.name, dep.version, latest.version);
                }
                *dep = Dependency::from_history(dep.name.clone(), latest);
            }
        }
    }

    /// Assert the witness package is a dependency.
    ///
    /// The pin at the witness address must be bound to the exact witness type.
    pub fn check(&self, version_witness: VersionWitness) -> Result<()> {
        let addr = version_witness.package_addr();
        let tag = version_witness.type_tag();
        if self
            .inner
            .iter()
            .any(|dep| dep.addr == addr && dep.witness == Some(tag))
        {
            Ok(())
        } else {
            Err(KeystoneError::NotDep(addr))
        }
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Dependency> {
        self.inner
            .iter()
            .find(|dep| dep.name == name)
            .ok_or_else(|| KeystoneError::DepNotFound(name.to_string()))
    }

    pub fn get_by_addr(&self, addr: Address) -> Result<&Dependency> {
        self.inner
            .iter()
            .find(|dep| dep.addr == addr)
            .ok_or_else(|| KeystoneError::DepNotFound(addr.to_string()))
    }

    pub fn get_by_idx(&self, idx: usize) -> Option<&Dependency> {
        self.inner.get(idx)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.inner.iter()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.inner.iter().any(|dep| dep.name == name)
    }

    pub fn contains_addr(&self, addr: Address) -> bool {
        self.inner.iter().any(|dep| dep.addr == addr)
    }

    pub fn unverified_allowed(&self) -> bool {
        self.unverified_allowed
    }

    /// Flip the unverified-allowed flag. Only reachable through a config intent.
    pub fn toggle_unverified_allowed(&mut self) {
        self.unverified_allowed = !self.unverified_allowed;
    }
}
