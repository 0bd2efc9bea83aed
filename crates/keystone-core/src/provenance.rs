//! Type provenance: which package and module a witness type comes from.
//!
//! Authorization in Keystone never relies on secrets. A module proves its
//! identity by handing over a value of a type only it can construct (a
//! witness with private fields), and the engine compares the [`TypeTag`] of
//! that type against what it recorded earlier.
//!
//! The `PACKAGE` and `MODULE` constants are labels chosen by the implementor.
//! They name things in logs, roles and addresses but never grant anything:
//! every gate compares `TypeId`s.

use std::any::{type_name, TypeId};
use std::fmt;

use crate::types::Address;

/// Declares where a type is defined.
///
/// Implement it on witness types whose fields are private to the defining
/// module, so that holding a value proves the caller is that module. The
/// constants are self-declared and only used as labels.
pub trait Provenance: 'static {
    /// Address of the package that defines the type.
    const PACKAGE: Address;
    /// Name of the module within the package.
    const MODULE: &'static str;
}

/// Runtime identity of a [`Provenance`] type.
///
/// Equality is by `TypeId` alone; two types declaring the same constants are
/// still different tags.
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    package: Address,
    module: &'static str,
    name: &'static str,
}

impl TypeTag {
    /// Tag of the type `T`.
    pub fn of<T: Provenance>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            package: T::PACKAGE,
            module: T::MODULE,
            name: short_name(type_name::<T>()),
        }
    }

    pub fn package(&self) -> Address {
        self.package
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.package, self.module, self.name)
    }
}

fn short_name(full: &'static str) -> &'static str {
    // Generic parameters are kept; only the leading path is dropped.
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// Proof that the caller belongs to a given package version.
///
/// Checked against the account dependencies before any privileged operation.
/// The whitelist binds each published version to the tag of its package
/// witness type, so the address alone proves nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionWitness {
    package: TypeTag,
}

impl VersionWitness {
    /// Mint a version witness from a package witness value.
    pub fn new<PW: Provenance>(_package_witness: PW) -> Self {
        Self {
            package: TypeTag::of::<PW>(),
        }
    }

    /// Address of the package the witness was minted by.
    pub fn package_addr(&self) -> Address {
        self.package.package()
    }

    /// Tag of the package witness type.
    pub fn type_tag(&self) -> TypeTag {
        self.package
    }
}

/// Build the role of an intent: `<package>::<module>` of the intent witness,
/// followed by `::<managed_name>` when one is given.
pub fn new_role<IW: Provenance>(managed_name: &str) -> String {
    let mut role = format!("{}::{}", IW::PACKAGE, IW::MODULE);
    if !managed_name.is_empty() {
        role.push_str("::");
        role.push_str(managed_name);
    }
    role
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    impl Provenance for Alpha {
        const PACKAGE: Address = Address::from_u64(0xa);
        const MODULE: &'static str = "alpha";
    }

    struct Beta;
    impl Provenance for Beta {
        const PACKAGE: Address = Address::from_u64(0xa);
        const MODULE: &'static str = "alpha";
    }

    #[test]
    fn test_type_tag_identity() {
        assert_eq!(TypeTag::of::<Alpha>(), TypeTag::of::<Alpha>());
        // Same constants, different types.
        assert_ne!(TypeTag::of::<Alpha>(), TypeTag::of::<Beta>());
        assert_eq!(TypeTag::of::<Alpha>().package(), TypeTag::of::<Beta>().package());
        assert_eq!(TypeTag::of::<Alpha>().name(), "Alpha");
    }

    #[test]
    fn test_version_witness_package() {
        let witness = VersionWitness::new(Alpha);
        assert_eq!(witness.package_addr(), Address::from_u64(0xa));
        assert_eq!(witness.type_tag(), TypeTag::of::<Alpha>());
        assert_ne!(witness, VersionWitness::new(Beta));
    }

    #[test]
    fn test_new_role() {
        let role = new_role::<Alpha>("");
        assert!(role.ends_with("::alpha"));
        let managed = new_role::<Alpha>("treasury");
        assert_eq!(managed, format!("{}::treasury", role));
    }
}
