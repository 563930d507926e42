use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recorded payment from one member to another. Append-only: settlements
/// never mutate prior expense records and cannot themselves be edited.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub group_id: String,
    pub from_email: String,
    pub to_email: String,
    pub amount: Decimal,
    pub note: Option<String>,
    /// Shared identifier when the settlement was part of a batch.
    pub batch_id: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettlementKind {
    Individual,
    Multiple,
}

/// Audit record kept alongside the ledger entry, written in the same
/// transaction, for reporting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: String,
    pub group_id: String,
    pub from_email: String,
    pub to_email: String,
    pub amount: Decimal,
    pub settled_at: DateTime<Utc>,
    pub settled_by: String,
    pub kind: SettlementKind,
    pub batch_id: Option<String>,
}
