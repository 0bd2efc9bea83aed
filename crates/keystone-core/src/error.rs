//! Error types for the Keystone engine.

use thiserror::Error;

use crate::types::{Address, ObjectId};

/// Main error type for Keystone operations.
///
/// Every failure aborts the current unit of work; nothing is retried inside
/// the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeystoneError {
    // Identity and provenance.
    /// Token or intent belongs to another account.
    #[error("Wrong account: expected {expected}, got {actual}")]
    WrongAccount { expected: Address, actual: Address },

    /// Intent witness does not match the intent's producer.
    #[error("Wrong witness: intent was produced by {expected}, got {actual}")]
    WrongWitness { expected: String, actual: String },

    /// Caller package is not listed in the account dependencies.
    #[error("Package {0} is not a dependency of this account")]
    NotDep(Address),

    /// Witness was not defined in the account's config module.
    #[error("Not called from the config module {expected}, got {actual}")]
    NotConfigModule { expected: String, actual: String },

    // Schedule and time.
    /// Params were built without any execution time.
    #[error("No execution time provided")]
    NoExecutionTime,

    /// Execution times must strictly increase.
    #[error("Execution times are not strictly ascending")]
    ExecutionTimesNotAscending,

    /// The earliest execution time has not been reached.
    #[error("Intent {key} cannot be executed before {execution_time}, now {now}")]
    CantBeExecutedYet {
        key: String,
        execution_time: u64,
        now: u64,
    },

    /// Intent still has scheduled executions.
    #[error("Intent {key} still has {remaining} scheduled executions")]
    CantBeRemovedYet { key: String, remaining: usize },

    /// Intent has not reached its expiration time.
    #[error("Intent {key} expires at {expiration_time}, now {now}")]
    HasntExpired {
        key: String,
        expiration_time: u64,
        now: u64,
    },

    /// Intent is one-shot but more than one execution time was scheduled.
    #[error("Intent must be executed once, {0} execution times scheduled")]
    SingleExecution(usize),

    // Registry.
    /// An intent with this key is already registered.
    #[error("Intent key already exists: {0}")]
    KeyAlreadyExists(String),

    /// No intent registered under this key.
    #[error("Intent key doesn't exist: {0}")]
    KeyDoesntExist(String),

    // Resource locks.
    /// Object is already reserved by a pending intent.
    #[error("Object {0} is already locked")]
    ObjectAlreadyLocked(ObjectId),

    /// Object is not reserved.
    #[error("Object {0} is not locked")]
    ObjectNotLocked(ObjectId),

    /// Received object differs from the reserved one.
    #[error("Wrong object: expected {expected}, received {actual}")]
    WrongObject { expected: ObjectId, actual: ObjectId },

    // Managed storage.
    /// Managed entry already present under this key.
    #[error("Managed {kind} already exists for key {key}")]
    AlreadyExists { kind: &'static str, key: String },

    /// Managed entry missing under this key.
    #[error("Managed {kind} doesn't exist for key {key}")]
    DoesntExist { kind: &'static str, key: String },

    // Linear completion.
    /// Executable confirmed before every action was processed.
    #[error("Intent {key} has {remaining} actions remaining")]
    ActionsRemaining { key: String, remaining: usize },

    /// Expired destroyed while cleanup actions remain.
    #[error("Expired intent still holds {0} actions")]
    ExpiredNotEmpty(usize),

    /// Action at the cursor has another type than requested.
    #[error("Action {index} is not of type {expected}")]
    WrongActionType { index: usize, expected: &'static str },

    /// No action left at the cursor.
    #[error("No action left at index {0}")]
    NoActionLeft(usize),

    // Outcome.
    /// Config module refused to release the executable.
    #[error("Outcome rejected for role {role}: {reason}")]
    OutcomeRejected { role: String, reason: String },

    // Dependencies and extensions.
    /// Names, addresses and versions have different lengths.
    #[error("Dependency names, addresses and versions must have the same length")]
    DepsNotSameLength,

    /// First dependency must be the core engine.
    #[error("First dependency must be {0}")]
    CoreDepMissing(&'static str),

    /// Dependency is not in the extension whitelist.
    #[error("Package {name}@{addr} v{version} is not a whitelisted extension")]
    NotExtension {
        name: String,
        addr: Address,
        version: u64,
    },

    /// Duplicate dependency name or address.
    #[error("Dependency already exists: {0}")]
    DepAlreadyExists(String),

    /// Dependency lookup failed.
    #[error("Dependency not found: {0}")]
    DepNotFound(String),

    /// Duplicate extension name or address.
    #[error("Extension already exists: {0}")]
    ExtensionAlreadyExists(String),

    /// Extension lookup failed.
    #[error("Extension not found: {0}")]
    ExtensionNotFound(String),

    /// Extension version must increase on update.
    #[error("Extension {name} version {version} is not newer than {latest}")]
    ExtensionVersionNotNewer {
        name: String,
        version: u64,
        latest: u64,
    },

    /// The core engine cannot be removed from the whitelist.
    #[error("The core engine extension cannot be removed")]
    CannotRemoveCore,

    // Metadata.
    /// Keys and values have different lengths.
    #[error("Metadata keys and values must have the same length")]
    MetadataNotSameLength,

    /// First metadata key must be "name".
    #[error("Metadata must start with a name entry")]
    MetadataNameMissing,

    /// Account name must not be empty.
    #[error("Account name cannot be empty")]
    NameCannotBeEmpty,

    /// Metadata key appears twice.
    #[error("Metadata key already exists: {0}")]
    MetadataKeyAlreadyExists(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl KeystoneError {
    /// Returns true if this error comes from an identity or provenance check.
    pub fn is_provenance(&self) -> bool {
        matches!(
            self,
            KeystoneError::WrongAccount { .. }
                | KeystoneError::WrongWitness { .. }
                | KeystoneError::NotDep(_)
                | KeystoneError::NotConfigModule { .. }
        )
    }

    /// Returns true if this error comes from a schedule or clock check.
    pub fn is_schedule(&self) -> bool {
        matches!(
            self,
            KeystoneError::NoExecutionTime
                | KeystoneError::ExecutionTimesNotAscending
                | KeystoneError::CantBeExecutedYet { .. }
                | KeystoneError::CantBeRemovedYet { .. }
                | KeystoneError::HasntExpired { .. }
                | KeystoneError::SingleExecution(_)
        )
    }

    /// Returns the intent key if available.
    pub fn key(&self) -> Option<&str> {
        match self {
            KeystoneError::CantBeExecutedYet { key, .. }
            | KeystoneError::CantBeRemovedYet { key, .. }
            | KeystoneError::HasntExpired { key, .. }
            | KeystoneError::ActionsRemaining { key, .. } => Some(key),
            KeystoneError::KeyAlreadyExists(key) | KeystoneError::KeyDoesntExist(key) => Some(key),
            _ => None,
        }
    }
}

/// Convenience Result type for Keystone operations.
pub type Result<T> = std::result::Result<T, KeystoneError>;

impl From<serde_json::Error> for KeystoneError {
    fn from(err: serde_json::Error) -> Self {
        KeystoneError::SerializationError(err.to_string())
    }
}
