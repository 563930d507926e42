pub mod in_memory;

use crate::core::errors::SplitbookError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

/// Events delivered best-effort after a mutation commits. A failed delivery
/// is logged and never rolls back or fails the mutation.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    MemberAdded {
        group_id: String,
        email: String,
    },
    MemberRemoved {
        group_id: String,
        email: String,
    },
    SettlementRecorded {
        group_id: String,
        from_email: String,
        to_email: String,
        amount: Decimal,
    },
    GroupDeleted {
        group_id: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), SplitbookError>;
}
