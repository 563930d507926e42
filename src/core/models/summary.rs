use crate::core::models::expense::{Expense, PaidBy, Payment, Share, SplitKind};
use crate::core::models::settlement::Settlement;
use crate::money::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ContributionType {
    /// Contributors already paid in full; contributions mirror the shares.
    AllClear,
    /// Explicit per-member contributed amounts, negative meaning "still owes".
    Custom,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SliceType {
    Equal,
    Custom,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MemberShare {
    pub email: String,
    pub share_amount: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Contribution {
    pub email: String,
    pub contributed_amount: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payback {
    pub id: String,
    pub from_email: String,
    pub to_email: String,
    pub amount: Decimal,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

/// How the slice is specified on summary creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SliceSpec {
    Equal { members: Vec<String> },
    Custom { shares: Vec<MemberShare> },
}

/// How contributions are specified on summary creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContributionSpec {
    AllClear,
    Custom { contributions: Vec<Contribution> },
}

/// Ad-hoc slice-tracking entry. Kept as a migration source into the
/// canonical ledger model rather than a parallel live balance path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount: Decimal,
    pub contribution_type: ContributionType,
    pub slice_type: SliceType,
    /// Derived obligations; sums to `amount` exactly.
    pub members_share_list: Vec<MemberShare>,
    /// Derived or client-supplied payments; sums to `amount` exactly.
    pub contribution_list: Vec<Contribution>,
    /// Append-only adjustments applied after creation.
    pub paybacks: Vec<Payback>,
    /// Bumped on every payback append; guards concurrent appends.
    pub revision: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionSummary {
    /// Per-member net within this summary: contributed minus share, adjusted
    /// by paybacks.
    pub fn balances(&self) -> HashMap<String, Decimal> {
        let mut balances: HashMap<String, Decimal> = HashMap::new();
        for share in &self.members_share_list {
            *balances.entry(share.email.clone()).or_default() -= share.share_amount;
        }
        for contribution in &self.contribution_list {
            *balances.entry(contribution.email.clone()).or_default() += contribution.contributed_amount;
        }
        for payback in &self.paybacks {
            *balances.entry(payback.from_email.clone()).or_default() += payback.amount;
            *balances.entry(payback.to_email.clone()).or_default() -= payback.amount;
        }
        balances
    }

    /// How much `email` still owes within this summary; zero when square or
    /// in credit. Paybacks are capped against this.
    pub fn outstanding(&self, email: &str) -> Decimal {
        let net = self.balances().get(email).copied().unwrap_or_default();
        if net < Decimal::ZERO { -net } else { Decimal::ZERO }
    }

    /// One-time migration into the canonical ledger model.
    ///
    /// Positive contributions become a multi-payer expense; a negative
    /// contribution folds into that member's share (it is debt beyond the
    /// share, not a payment). Paybacks become settlement entries. Per-member
    /// nets are preserved exactly.
    pub fn to_ledger_entries(&self, currency: &Currency, migrated_by: &str) -> (Expense, Vec<Settlement>) {
        let now = Utc::now();
        let mut shares: Vec<Share> = self
            .members_share_list
            .iter()
            .map(|s| Share {
                email: s.email.clone(),
                amount: s.share_amount,
            })
            .collect();

        let mut payments = Vec::new();
        for contribution in &self.contribution_list {
            if contribution.contributed_amount > Decimal::ZERO {
                payments.push(Payment {
                    email: contribution.email.clone(),
                    amount: contribution.contributed_amount,
                });
            } else if contribution.contributed_amount < Decimal::ZERO {
                let extra = -contribution.contributed_amount;
                match shares.iter_mut().find(|s| s.email == contribution.email) {
                    Some(share) => share.amount += extra,
                    None => shares.push(Share {
                        email: contribution.email.clone(),
                        amount: extra,
                    }),
                }
            }
        }

        let total: Decimal = payments.iter().map(|p| p.amount).sum();
        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            group_id: self.group_id.clone(),
            description: self.description.clone(),
            amount: total,
            currency: currency.clone(),
            date: now.date_naive(),
            category: None,
            note: Some(format!("Migrated from summary {}", self.id)),
            paid_by: PaidBy::Multiple { payments },
            shares,
            split: match self.slice_type {
                SliceType::Equal => SplitKind::Equal,
                SliceType::Custom => SplitKind::Custom,
            },
            added_by: migrated_by.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let settlements = self
            .paybacks
            .iter()
            .map(|p| Settlement {
                id: Uuid::new_v4().to_string(),
                group_id: self.group_id.clone(),
                from_email: p.from_email.clone(),
                to_email: p.to_email.clone(),
                amount: p.amount,
                note: Some(format!("Payback migrated from summary {}", self.id)),
                batch_id: None,
                recorded_by: migrated_by.to_string(),
                created_at: now,
            })
            .collect();

        (expense, settlements)
    }
}
