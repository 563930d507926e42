use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

/// Coarse classification used by boundary layers to translate errors into
/// status codes. The core itself only ever deals in `SplitbookError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    Conflict,
    Dependency,
}

#[derive(Error, Debug, Serialize)]
pub enum SplitbookError {
    #[error("Amount must be positive with at most two decimal places, got {0}")]
    InvalidAmount(Decimal),
    #[error("Cannot settle a debt with yourself")]
    SelfSettlement,
    #[error("Share amounts must sum to the expense total: expected {expected}, got {actual}")]
    SplitMismatch { expected: Decimal, actual: Decimal },
    #[error("Payments must sum to the expense total: expected {expected}, got {actual}")]
    PaymentMismatch { expected: Decimal, actual: Decimal },
    #[error("Contributions must sum to the summary amount: expected {expected}, got {actual}")]
    ContributionMismatch { expected: Decimal, actual: Decimal },
    #[error("An equal split needs at least one participant")]
    EmptySplit,
    #[error("A batch settlement needs at least one item")]
    EmptyBatch,
    #[error("Settlement entries are append-only and cannot be modified")]
    SettlementImmutable,
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
    #[error("Group {0} not found")]
    GroupNotFound(String),
    #[error("Entry {0} not found")]
    EntryNotFound(String),
    #[error("Entry {0} is already deleted")]
    EntryAlreadyDeleted(String),
    #[error("Summary {0} not found")]
    SummaryNotFound(String),
    #[error("Member {0} is not part of the group")]
    MemberNotInGroup(String),
    #[error("User {0} is not a group member")]
    NotGroupMember(String),
    #[error("User {0} is not the group owner")]
    NotGroupOwner(String),
    #[error("The group owner cannot be removed")]
    OwnerCannotBeRemoved,
    #[error("Cannot remove the last group member")]
    CannotRemoveLastMember,
    #[error("Member {0} already exists in the group")]
    MemberAlreadyExists(String),
    #[error("Member {email} still has an outstanding balance of {net} and must settle first")]
    OutstandingBalance { email: String, net: Decimal },
    #[error("Amount exceeds outstanding balance of {outstanding}")]
    ExceedsOutstandingBalance { outstanding: Decimal },
    #[error("The ledger changed while the operation was in flight")]
    ConcurrentModification,
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
    #[error("Notification error: {0}")]
    NotificationError(String),
    #[error("Rate provider error: {0}")]
    RateProviderError(String),
}

impl SplitbookError {
    pub fn kind(&self) -> ErrorKind {
        use SplitbookError::*;
        match self {
            InvalidAmount(_) | SelfSettlement | SplitMismatch { .. } | PaymentMismatch { .. }
            | ContributionMismatch { .. } | EmptySplit | EmptyBatch | SettlementImmutable
            | InvalidEmail(_) | InvalidInput(_, _) | CannotRemoveLastMember => ErrorKind::Validation,
            GroupNotFound(_) | EntryNotFound(_) | SummaryNotFound(_) | MemberNotInGroup(_) => {
                ErrorKind::NotFound
            }
            NotGroupMember(_) | NotGroupOwner(_) | OwnerCannotBeRemoved => ErrorKind::Authorization,
            MemberAlreadyExists(_) | OutstandingBalance { .. } | ExceedsOutstandingBalance { .. }
            | ConcurrentModification | EntryAlreadyDeleted(_) => ErrorKind::Conflict,
            StorageError(_) | LoggingError(_) | NotificationError(_) | RateProviderError(_) => {
                ErrorKind::Dependency
            }
        }
    }
}
