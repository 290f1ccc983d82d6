#![forbid(unsafe_code)]

use psip_contracts::project::VersionId;
use psip_contracts::ContractViolation;
use psip_engines::validation::ValidationRefusal;
use psip_storage::StorageError;

/// Runtime-level refusal. Every variant maps to exactly one boundary
/// outcome, so the adapter never has to reinterpret a storage detail.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// The referenced school is not in the masterlist.
    UnknownScope { scope_key: String },
    /// A field failed boundary validation; nothing was written.
    StructuralViolation(ContractViolation),
    /// No row exists for the referenced key.
    NotFound { entity: &'static str, key: String },
    /// The decision referenced a version that is no longer current.
    StaleDecision {
        referenced: VersionId,
        current: VersionId,
    },
    Forbidden { reason: &'static str },
    Unavailable { reason: String },
}

impl From<ContractViolation> for LedgerError {
    fn from(v: ContractViolation) -> Self {
        LedgerError::StructuralViolation(v)
    }
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::ForeignKeyViolation { table, key } => {
                // Scope foreign keys surface as an unknown school; any other
                // dangling reference is a missing row.
                if table.ends_with("scope_key") || table.ends_with("school_id") {
                    LedgerError::UnknownScope { scope_key: key }
                } else {
                    LedgerError::NotFound { entity: table, key }
                }
            }
            StorageError::AppendOnlyViolation { table } => LedgerError::Unavailable {
                reason: format!("{table} is append-only"),
            },
            StorageError::ContractViolation(v) => LedgerError::StructuralViolation(v),
            StorageError::Unavailable { reason } => LedgerError::Unavailable { reason },
        }
    }
}

impl From<ValidationRefusal> for LedgerError {
    fn from(e: ValidationRefusal) -> Self {
        match e {
            ValidationRefusal::Contract(v) => LedgerError::StructuralViolation(v),
            ValidationRefusal::Forbidden { reason } => LedgerError::Forbidden { reason },
            ValidationRefusal::StaleDecision {
                referenced,
                current,
            } => LedgerError::StaleDecision {
                referenced,
                current,
            },
        }
    }
}
