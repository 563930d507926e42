use crate::money::Currency;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Who fronted the money for an expense.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PaidBy {
    Individual { email: String },
    Multiple { payments: Vec<Payment> },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub email: String,
    pub amount: Decimal,
}

/// How the expense is divided across participants.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ShareWith {
    Equal { members: Vec<String> },
    Custom { shares: Vec<Share> },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Share {
    pub email: String,
    pub amount: Decimal,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SplitKind {
    Equal,
    Custom,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub description: String,
    /// Total in the group currency, two decimal places.
    pub amount: Decimal,
    pub currency: Currency,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub note: Option<String>,
    pub paid_by: PaidBy,
    /// Resolved per-member obligations; always sums to `amount` exactly.
    pub shares: Vec<Share>,
    pub split: SplitKind,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Per-payer credits. An individual payer carries the whole amount.
    pub fn payments(&self) -> Vec<(&str, Decimal)> {
        match &self.paid_by {
            PaidBy::Individual { email } => vec![(email.as_str(), self.amount)],
            PaidBy::Multiple { payments } => {
                payments.iter().map(|p| (p.email.as_str(), p.amount)).collect()
            }
        }
    }
}
