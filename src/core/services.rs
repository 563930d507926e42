use crate::constants::{
    BALANCE_QUERIED, BATCH_SETTLEMENT_RECORDED, EXPENSE_ADDED, EXPENSE_DELETED, EXPENSE_UPDATED,
    GROUP_CREATED, GROUP_DELETED, GROUP_RENAMED, MAX_AMOUNT, MAX_COMMIT_ATTEMPTS,
    MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MEMBER_ADDED, MEMBER_REMOVED, PAYBACK_RECORDED,
    SETTLEMENT_RECORDED, SUMMARY_CREATED, SUMMARY_MIGRATED,
};
use crate::core::balance::BalanceSheet;
use crate::core::errors::{FieldError, SplitbookError};
use crate::core::models::{
    audit::{AppLog, GroupAudit},
    balance::{MemberBalance, Transfer},
    entry::LedgerEntry,
    expense::{Expense, PaidBy, Payment, Share, ShareWith, SplitKind},
    group::{Group, GroupMember, Role},
    settlement::{Settlement, SettlementKind, SettlementRecord},
    summary::{
        Contribution, ContributionSpec, ContributionType, MemberShare, Payback, SliceSpec,
        SliceType, TransactionSummary,
    },
};
use crate::core::split;
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::notify::{Notification, Notifier};
use crate::infrastructure::storage::Storage;
use crate::money::convert::{CurrencyConverter, RateProvider};
use crate::money::{Currency, is_cent_precise};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A new expense as submitted by a caller, before normalization into the
/// group currency.
#[derive(Clone, Debug, Deserialize)]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub note: Option<String>,
    pub paid_by: PaidBy,
    pub share_with: ShareWith,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SettlementRequest {
    pub from_email: String,
    pub to_email: String,
    pub amount: Decimal,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SummaryDraft {
    pub description: String,
    pub amount: Decimal,
    pub slice: SliceSpec,
    pub contribution: ContributionSpec,
}

#[derive(Clone, Debug, Serialize)]
pub struct GroupBalancesResponse {
    pub balances: HashMap<String, MemberBalance>,
    pub suggested_transfers: Vec<Transfer>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SettleDebtOutcome {
    pub settlement: Settlement,
    /// Fresh nets for the two parties involved.
    pub updated_balances: HashMap<String, Decimal>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchSettleOutcome {
    pub batch_id: String,
    pub applied: usize,
}

pub struct SplitbookService<L, S, N, P> {
    storage: S,
    logging: L,
    notifier: N,
    converter: CurrencyConverter<P>,
}

impl<L, S, N, P> SplitbookService<L, S, N, P>
where
    L: LoggingService,
    S: Storage,
    N: Notifier,
    P: RateProvider,
{
    pub fn new(storage: S, logging: L, notifier: N, converter: CurrencyConverter<P>) -> Self {
        SplitbookService {
            storage,
            logging,
            notifier,
            converter,
        }
    }

    // VALIDATION HELPERS

    async fn active_group(&self, group_id: &str) -> Result<Group, SplitbookError> {
        self.storage
            .get_group(group_id)
            .await?
            .filter(|g| !g.deleted)
            .ok_or_else(|| SplitbookError::GroupNotFound(group_id.to_string()))
    }

    fn require_member(&self, group: &Group, email: &str) -> Result<(), SplitbookError> {
        if !group.is_member(email) {
            return Err(SplitbookError::NotGroupMember(email.to_string()));
        }
        Ok(())
    }

    fn require_owner(&self, group: &Group, email: &str) -> Result<(), SplitbookError> {
        if !group.is_owner(email) {
            warn!(
                "User {} attempted an owner-only operation on group {}",
                email, group.id
            );
            return Err(SplitbookError::NotGroupOwner(email.to_string()));
        }
        Ok(())
    }

    fn validate_email(&self, email: &str) -> Result<(), SplitbookError> {
        if !email.contains('@') || !email.contains('.') || email.len() < 5 {
            return Err(SplitbookError::InvalidEmail(email.to_string()));
        }
        Ok(())
    }

    fn validate_string_input(
        &self,
        field: &str,
        value: &str,
        max_length: usize,
    ) -> Result<(), SplitbookError> {
        if value.trim().is_empty() {
            return Err(SplitbookError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("Invalid {}", field),
                    description: format!("{} cannot be empty", field),
                },
            ));
        }
        if value.len() > max_length {
            return Err(SplitbookError::InvalidInput(
                field.to_string(),
                FieldError {
                    field: field.to_string(),
                    title: format!("{} Too Long", field),
                    description: format!("{} cannot exceed {} characters", field, max_length),
                },
            ));
        }
        Ok(())
    }

    fn validate_amount(&self, amount: Decimal) -> Result<(), SplitbookError> {
        if amount <= Decimal::ZERO
            || amount > Decimal::from(MAX_AMOUNT)
            || !is_cent_precise(amount)
        {
            return Err(SplitbookError::InvalidAmount(amount));
        }
        Ok(())
    }

    async fn log_and_audit(
        &self,
        group_id: Option<&str>,
        action: &str,
        details: serde_json::Value,
        actor: Option<&str>,
    ) -> Result<(), SplitbookError> {
        self.logging.log_action(action, details.clone(), actor).await?;
        if let Some(gid) = group_id {
            self.storage
                .save_group_audit(GroupAudit {
                    id: Uuid::new_v4().to_string(),
                    group_id: gid.to_string(),
                    action: action.to_string(),
                    actor: actor.map(String::from),
                    details,
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    /// Best-effort delivery after a committed mutation; failures are logged
    /// and never surfaced to the caller.
    async fn notify(&self, notification: Notification) {
        if let Err(err) = self.notifier.send(notification).await {
            warn!("notification delivery failed: {}", err);
        }
    }

    // GROUP MANAGEMENT

    pub async fn create_group(
        &self,
        name: String,
        currency: Currency,
        member_emails: Vec<String>,
        created_by: &str,
    ) -> Result<Group, SplitbookError> {
        info!("Creating group '{}' owned by {}", name, created_by);
        self.validate_string_input("name", &name, MAX_NAME_LEN)?;
        self.validate_email(created_by)?;

        let now = Utc::now();
        let mut members = vec![GroupMember {
            email: created_by.to_string(),
            role: Role::Owner,
            joined_at: now,
        }];
        for email in &member_emails {
            self.validate_email(email)?;
            if members.iter().any(|m| m.email == *email) {
                return Err(SplitbookError::MemberAlreadyExists(email.clone()));
            }
            members.push(GroupMember {
                email: email.clone(),
                role: Role::Member,
                joined_at: now,
            });
        }

        let group = Group {
            id: Uuid::new_v4().to_string(),
            name,
            owner_email: created_by.to_string(),
            currency,
            members,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.storage.save_group(group.clone()).await?;

        self.log_and_audit(
            Some(&group.id),
            GROUP_CREATED,
            json!({
                "group_id": group.id,
                "name": group.name,
                "member_emails": group.members.iter().map(|m| m.email.clone()).collect::<Vec<_>>()
            }),
            Some(created_by),
        )
        .await?;

        Ok(group)
    }

    pub async fn rename_group(
        &self,
        group_id: &str,
        new_name: String,
        renamed_by: &str,
    ) -> Result<Group, SplitbookError> {
        info!("Renaming group {} by {}", group_id, renamed_by);
        let mut group = self.active_group(group_id).await?;
        self.require_owner(&group, renamed_by)?;
        self.validate_string_input("name", &new_name, MAX_NAME_LEN)?;

        let old_name = std::mem::replace(&mut group.name, new_name);
        group.updated_at = Utc::now();
        self.storage.save_group(group.clone()).await?;

        self.log_and_audit(
            Some(group_id),
            GROUP_RENAMED,
            json!({ "group_id": group_id, "old_name": old_name, "new_name": group.name }),
            Some(renamed_by),
        )
        .await?;
        Ok(group)
    }

    pub async fn delete_group(&self, group_id: &str, deleted_by: &str) -> Result<(), SplitbookError> {
        info!("Deleting group {} by {}", group_id, deleted_by);
        let group = self.active_group(group_id).await?;
        self.require_owner(&group, deleted_by)?;

        self.storage.delete_group(group_id).await?;

        self.log_and_audit(
            Some(group_id),
            GROUP_DELETED,
            json!({ "group_id": group_id, "name": group.name }),
            Some(deleted_by),
        )
        .await?;
        self.notify(Notification::GroupDeleted {
            group_id: group_id.to_string(),
        })
        .await;
        Ok(())
    }

    pub async fn add_member(
        &self,
        group_id: &str,
        email: &str,
        added_by: &str,
    ) -> Result<Group, SplitbookError> {
        info!("Adding member {} to group {} by {}", email, group_id, added_by);
        let mut group = self.active_group(group_id).await?;
        self.require_owner(&group, added_by)?;
        self.validate_email(email)?;

        if group.is_member(email) {
            return Err(SplitbookError::MemberAlreadyExists(email.to_string()));
        }

        group.members.push(GroupMember {
            email: email.to_string(),
            role: Role::Member,
            joined_at: Utc::now(),
        });
        group.updated_at = Utc::now();
        self.storage.save_group(group.clone()).await?;

        self.log_and_audit(
            Some(group_id),
            MEMBER_ADDED,
            json!({ "group_id": group_id, "email": email }),
            Some(added_by),
        )
        .await?;
        self.notify(Notification::MemberAdded {
            group_id: group_id.to_string(),
            email: email.to_string(),
        })
        .await;
        Ok(group)
    }

    /// Removal is refused while the member still owes or is owed anything;
    /// the balance must be settled first.
    pub async fn remove_member(
        &self,
        group_id: &str,
        email: &str,
        removed_by: &str,
    ) -> Result<Group, SplitbookError> {
        info!(
            "Removing member {} from group {} by {}",
            email, group_id, removed_by
        );
        let mut group = self.active_group(group_id).await?;
        self.require_owner(&group, removed_by)?;

        if !group.is_member(email) {
            return Err(SplitbookError::MemberNotInGroup(email.to_string()));
        }
        if group.is_owner(email) {
            return Err(SplitbookError::OwnerCannotBeRemoved);
        }
        if group.members.len() <= 1 {
            return Err(SplitbookError::CannotRemoveLastMember);
        }

        let ledger = self.storage.ledger(group_id).await?;
        let net = BalanceSheet::compute(&ledger.entries).net(email);
        if !net.is_zero() {
            return Err(SplitbookError::OutstandingBalance {
                email: email.to_string(),
                net,
            });
        }

        group.members.retain(|m| m.email != email);
        group.updated_at = Utc::now();
        self.storage.save_group(group.clone()).await?;

        self.log_and_audit(
            Some(group_id),
            MEMBER_REMOVED,
            json!({ "group_id": group_id, "email": email }),
            Some(removed_by),
        )
        .await?;
        self.notify(Notification::MemberRemoved {
            group_id: group_id.to_string(),
            email: email.to_string(),
        })
        .await;
        Ok(group)
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Group, SplitbookError> {
        self.active_group(group_id).await
    }

    pub async fn get_member_groups(&self, email: &str) -> Result<Vec<Group>, SplitbookError> {
        self.storage.get_member_groups(email).await
    }

    // EXPENSES

    /// Validate a draft against the group and normalize it into the group
    /// currency. Sums are validated in the submitted currency, where they
    /// are exact; payments and custom shares are then rescaled
    /// proportionally onto the converted total so the exact-sum invariant
    /// holds in the group currency too.
    async fn resolve_expense_parts(
        &self,
        group: &Group,
        draft: &ExpenseDraft,
    ) -> Result<(Decimal, PaidBy, Vec<Share>, SplitKind), SplitbookError> {
        self.validate_amount(draft.amount)?;

        match &draft.paid_by {
            PaidBy::Individual { email } => {
                if !group.is_member(email) {
                    return Err(SplitbookError::MemberNotInGroup(email.clone()));
                }
            }
            PaidBy::Multiple { payments } => {
                if payments.is_empty() {
                    return Err(SplitbookError::PaymentMismatch {
                        expected: draft.amount,
                        actual: Decimal::ZERO,
                    });
                }
                for payment in payments {
                    if !group.is_member(&payment.email) {
                        return Err(SplitbookError::MemberNotInGroup(payment.email.clone()));
                    }
                    if payment.amount <= Decimal::ZERO || !is_cent_precise(payment.amount) {
                        return Err(SplitbookError::InvalidAmount(payment.amount));
                    }
                }
                let actual: Decimal = payments.iter().map(|p| p.amount).sum();
                if actual != draft.amount {
                    return Err(SplitbookError::PaymentMismatch {
                        expected: draft.amount,
                        actual,
                    });
                }
            }
        }

        match &draft.share_with {
            ShareWith::Equal { members } => {
                if members.is_empty() {
                    return Err(SplitbookError::EmptySplit);
                }
                for email in members {
                    if !group.is_member(email) {
                        return Err(SplitbookError::MemberNotInGroup(email.clone()));
                    }
                }
            }
            ShareWith::Custom { shares } => {
                for share in shares {
                    if !group.is_member(&share.email) {
                        return Err(SplitbookError::MemberNotInGroup(share.email.clone()));
                    }
                }
                split::validate_custom(shares, draft.amount)?;
            }
        }

        let total = self
            .converter
            .convert(draft.amount, &draft.currency, &group.currency)
            .await;
        if total <= Decimal::ZERO {
            return Err(SplitbookError::InvalidAmount(total));
        }

        let paid_by = match &draft.paid_by {
            PaidBy::Individual { email } => PaidBy::Individual {
                email: email.clone(),
            },
            PaidBy::Multiple { payments } => {
                let amounts: Vec<Decimal> = payments.iter().map(|p| p.amount).collect();
                let rescaled = split::rescale(&amounts, draft.amount, total);
                PaidBy::Multiple {
                    payments: payments
                        .iter()
                        .zip(rescaled)
                        .map(|(p, amount)| Payment {
                            email: p.email.clone(),
                            amount,
                        })
                        .collect(),
                }
            }
        };

        let (shares, kind) = match &draft.share_with {
            ShareWith::Equal { members } => (split::equal_shares(total, members)?, SplitKind::Equal),
            ShareWith::Custom { shares } => {
                let amounts: Vec<Decimal> = shares.iter().map(|s| s.amount).collect();
                let rescaled = split::rescale(&amounts, draft.amount, total);
                (
                    shares
                        .iter()
                        .zip(rescaled)
                        .map(|(s, amount)| Share {
                            email: s.email.clone(),
                            amount,
                        })
                        .collect(),
                    SplitKind::Custom,
                )
            }
        };

        Ok((total, paid_by, shares, kind))
    }

    pub async fn add_expense(
        &self,
        group_id: &str,
        draft: ExpenseDraft,
        created_by: &str,
    ) -> Result<Expense, SplitbookError> {
        info!("Adding expense to group {} by {}", group_id, created_by);
        let group = self.active_group(group_id).await?;
        self.require_member(&group, created_by)?;
        self.validate_string_input("description", &draft.description, MAX_DESCRIPTION_LEN)?;
        let (amount, paid_by, shares, split) = self.resolve_expense_parts(&group, &draft).await?;

        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            group_id: group.id.clone(),
            description: draft.description,
            amount,
            currency: group.currency.clone(),
            date: draft.date,
            category: draft.category,
            note: draft.note,
            paid_by,
            shares,
            split,
            added_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let mut attempts = 0;
        loop {
            let ledger = self.storage.ledger(group_id).await?;
            match self
                .storage
                .append_entries(
                    group_id,
                    ledger.version,
                    vec![LedgerEntry::Expense(expense.clone())],
                    Vec::new(),
                )
                .await
            {
                Ok(_) => break,
                Err(SplitbookError::ConcurrentModification) => {
                    attempts += 1;
                    if attempts >= MAX_COMMIT_ATTEMPTS {
                        return Err(SplitbookError::ConcurrentModification);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        debug!("Expense created with ID: {}", expense.id);

        self.log_and_audit(
            Some(group_id),
            EXPENSE_ADDED,
            json!({
                "entry_id": expense.id,
                "group_id": group_id,
                "description": expense.description,
                "amount": expense.amount
            }),
            Some(created_by),
        )
        .await?;
        Ok(expense)
    }

    pub async fn update_expense(
        &self,
        group_id: &str,
        entry_id: &str,
        draft: ExpenseDraft,
        updated_by: &str,
    ) -> Result<Expense, SplitbookError> {
        info!(
            "Updating expense {} in group {} by {}",
            entry_id, group_id, updated_by
        );
        let group = self.active_group(group_id).await?;
        self.require_member(&group, updated_by)?;
        self.validate_string_input("description", &draft.description, MAX_DESCRIPTION_LEN)?;
        let (amount, paid_by, shares, split) = self.resolve_expense_parts(&group, &draft).await?;

        let mut attempts = 0;
        loop {
            let ledger = self.storage.ledger(group_id).await?;
            let existing = ledger
                .entries
                .iter()
                .find(|e| e.id() == entry_id)
                .ok_or_else(|| SplitbookError::EntryNotFound(entry_id.to_string()))?;
            let existing = match existing {
                LedgerEntry::Expense(e) => e,
                LedgerEntry::Settlement(_) => return Err(SplitbookError::SettlementImmutable),
            };
            if existing.is_deleted() {
                return Err(SplitbookError::EntryNotFound(entry_id.to_string()));
            }

            let updated = Expense {
                description: draft.description.clone(),
                amount,
                currency: group.currency.clone(),
                date: draft.date,
                category: draft.category.clone(),
                note: draft.note.clone(),
                paid_by: paid_by.clone(),
                shares: shares.clone(),
                split,
                updated_at: Utc::now(),
                ..existing.clone()
            };
            match self
                .storage
                .replace_entry(group_id, ledger.version, LedgerEntry::Expense(updated.clone()))
                .await
            {
                Ok(_) => {
                    self.log_and_audit(
                        Some(group_id),
                        EXPENSE_UPDATED,
                        json!({ "entry_id": entry_id, "group_id": group_id, "new_amount": amount }),
                        Some(updated_by),
                    )
                    .await?;
                    return Ok(updated);
                }
                Err(SplitbookError::ConcurrentModification) => {
                    attempts += 1;
                    if attempts >= MAX_COMMIT_ATTEMPTS {
                        return Err(SplitbookError::ConcurrentModification);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn delete_expense(
        &self,
        group_id: &str,
        entry_id: &str,
        deleted_by: &str,
    ) -> Result<Expense, SplitbookError> {
        info!(
            "Deleting expense {} in group {} by {}",
            entry_id, group_id, deleted_by
        );
        let group = self.active_group(group_id).await?;
        self.require_member(&group, deleted_by)?;

        let mut attempts = 0;
        loop {
            let ledger = self.storage.ledger(group_id).await?;
            let existing = ledger
                .entries
                .iter()
                .find(|e| e.id() == entry_id)
                .ok_or_else(|| SplitbookError::EntryNotFound(entry_id.to_string()))?;
            let existing = match existing {
                LedgerEntry::Expense(e) => e,
                LedgerEntry::Settlement(_) => return Err(SplitbookError::SettlementImmutable),
            };
            if existing.is_deleted() {
                return Err(SplitbookError::EntryAlreadyDeleted(entry_id.to_string()));
            }

            let now = Utc::now();
            let deleted = Expense {
                deleted_at: Some(now),
                updated_at: now,
                ..existing.clone()
            };
            match self
                .storage
                .replace_entry(group_id, ledger.version, LedgerEntry::Expense(deleted.clone()))
                .await
            {
                Ok(_) => {
                    self.log_and_audit(
                        Some(group_id),
                        EXPENSE_DELETED,
                        json!({ "entry_id": entry_id, "group_id": group_id }),
                        Some(deleted_by),
                    )
                    .await?;
                    return Ok(deleted);
                }
                Err(SplitbookError::ConcurrentModification) => {
                    attempts += 1;
                    if attempts >= MAX_COMMIT_ATTEMPTS {
                        return Err(SplitbookError::ConcurrentModification);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Entry history with soft-deleted expenses filtered out.
    pub async fn get_entries(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<Vec<LedgerEntry>, SplitbookError> {
        let group = self.active_group(group_id).await?;
        self.require_member(&group, queried_by)?;
        let ledger = self.storage.ledger(group_id).await?;
        Ok(ledger
            .entries
            .into_iter()
            .filter(|e| e.as_expense().map(|x| !x.is_deleted()).unwrap_or(true))
            .collect())
    }

    // BALANCES

    /// Always recomputed from the full entry set, never cached, so the
    /// response reflects every entry committed so far.
    pub async fn group_balances(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<GroupBalancesResponse, SplitbookError> {
        debug!("Calculating balances for group {}", group_id);
        let group = self.active_group(group_id).await?;
        self.require_member(&group, queried_by)?;

        let ledger = self.storage.ledger(group_id).await?;
        let sheet = BalanceSheet::compute(&ledger.entries);
        let mut balances = sheet.balances().clone();
        for member in &group.members {
            balances.entry(member.email.clone()).or_default();
        }

        self.log_and_audit(
            Some(group_id),
            BALANCE_QUERIED,
            json!({ "group_id": group_id }),
            Some(queried_by),
        )
        .await?;

        Ok(GroupBalancesResponse {
            balances,
            suggested_transfers: sheet.suggested_transfers(),
        })
    }

    // SETTLEMENTS

    fn validate_settlement_item(
        &self,
        group: &Group,
        sheet: &BalanceSheet,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<(), SplitbookError> {
        self.validate_amount(amount)?;
        if from == to {
            return Err(SplitbookError::SelfSettlement);
        }
        // Historical participants may settle even after leaving the group.
        for email in [from, to] {
            if !group.is_member(email) && !sheet.is_participant(email) {
                return Err(SplitbookError::MemberNotInGroup(email.to_string()));
            }
        }
        let outstanding = sheet.outstanding_between(from, to);
        if amount > outstanding {
            return Err(SplitbookError::ExceedsOutstandingBalance { outstanding });
        }
        Ok(())
    }

    /// Record a single debt payoff. The balance check and the append run
    /// against the same ledger version; a concurrent commit in between
    /// fails the CAS and the whole operation is revalidated from scratch.
    pub async fn settle_debt(
        &self,
        group_id: &str,
        from_email: &str,
        to_email: &str,
        amount: Decimal,
        note: Option<String>,
        recorded_by: &str,
    ) -> Result<SettleDebtOutcome, SplitbookError> {
        info!(
            "Settling {} from {} to {} in group {}",
            amount, from_email, to_email, group_id
        );
        let group = self.active_group(group_id).await?;
        self.require_member(&group, recorded_by)?;

        let mut attempts = 0;
        loop {
            let ledger = self.storage.ledger(group_id).await?;
            let mut sheet = BalanceSheet::compute(&ledger.entries);
            self.validate_settlement_item(&group, &sheet, from_email, to_email, amount)?;

            let now = Utc::now();
            let settlement = Settlement {
                id: Uuid::new_v4().to_string(),
                group_id: group_id.to_string(),
                from_email: from_email.to_string(),
                to_email: to_email.to_string(),
                amount,
                note: note.clone(),
                batch_id: None,
                recorded_by: recorded_by.to_string(),
                created_at: now,
            };
            let record = SettlementRecord {
                id: Uuid::new_v4().to_string(),
                group_id: group_id.to_string(),
                from_email: from_email.to_string(),
                to_email: to_email.to_string(),
                amount,
                settled_at: now,
                settled_by: recorded_by.to_string(),
                kind: SettlementKind::Individual,
                batch_id: None,
            };

            match self
                .storage
                .append_entries(
                    group_id,
                    ledger.version,
                    vec![LedgerEntry::Settlement(settlement.clone())],
                    vec![record],
                )
                .await
            {
                Ok(_) => {
                    sheet.record_settlement(from_email, to_email, amount);
                    let updated_balances = HashMap::from([
                        (from_email.to_string(), sheet.net(from_email)),
                        (to_email.to_string(), sheet.net(to_email)),
                    ]);

                    self.log_and_audit(
                        Some(group_id),
                        SETTLEMENT_RECORDED,
                        json!({
                            "settlement_id": settlement.id,
                            "group_id": group_id,
                            "from_email": from_email,
                            "to_email": to_email,
                            "amount": amount
                        }),
                        Some(recorded_by),
                    )
                    .await?;
                    self.notify(Notification::SettlementRecorded {
                        group_id: group_id.to_string(),
                        from_email: from_email.to_string(),
                        to_email: to_email.to_string(),
                        amount,
                    })
                    .await;

                    return Ok(SettleDebtOutcome {
                        settlement,
                        updated_balances,
                    });
                }
                Err(SplitbookError::ConcurrentModification) => {
                    attempts += 1;
                    if attempts >= MAX_COMMIT_ATTEMPTS {
                        return Err(SplitbookError::ConcurrentModification);
                    }
                    debug!("Settlement CAS conflict in group {}, retrying", group_id);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// All-or-nothing batch payoff. Every item is validated against a
    /// working balance sheet that absorbs the earlier items, so cumulative
    /// over-settlement within the batch is caught before anything is
    /// written; one failing item means zero writes.
    pub async fn settle_multiple(
        &self,
        group_id: &str,
        requests: Vec<SettlementRequest>,
        recorded_by: &str,
    ) -> Result<BatchSettleOutcome, SplitbookError> {
        info!(
            "Settling batch of {} items in group {} by {}",
            requests.len(),
            group_id,
            recorded_by
        );
        let group = self.active_group(group_id).await?;
        self.require_member(&group, recorded_by)?;
        if requests.is_empty() {
            return Err(SplitbookError::EmptyBatch);
        }

        let batch_id = Uuid::new_v4().to_string();
        let mut attempts = 0;
        loop {
            let ledger = self.storage.ledger(group_id).await?;
            let mut sheet = BalanceSheet::compute(&ledger.entries);

            let now = Utc::now();
            let mut entries = Vec::with_capacity(requests.len());
            let mut records = Vec::with_capacity(requests.len());
            for request in &requests {
                self.validate_settlement_item(
                    &group,
                    &sheet,
                    &request.from_email,
                    &request.to_email,
                    request.amount,
                )?;
                sheet.record_settlement(&request.from_email, &request.to_email, request.amount);

                entries.push(LedgerEntry::Settlement(Settlement {
                    id: Uuid::new_v4().to_string(),
                    group_id: group_id.to_string(),
                    from_email: request.from_email.clone(),
                    to_email: request.to_email.clone(),
                    amount: request.amount,
                    note: request.note.clone(),
                    batch_id: Some(batch_id.clone()),
                    recorded_by: recorded_by.to_string(),
                    created_at: now,
                }));
                records.push(SettlementRecord {
                    id: Uuid::new_v4().to_string(),
                    group_id: group_id.to_string(),
                    from_email: request.from_email.clone(),
                    to_email: request.to_email.clone(),
                    amount: request.amount,
                    settled_at: now,
                    settled_by: recorded_by.to_string(),
                    kind: SettlementKind::Multiple,
                    batch_id: Some(batch_id.clone()),
                });
            }

            match self
                .storage
                .append_entries(group_id, ledger.version, entries, records)
                .await
            {
                Ok(_) => {
                    self.log_and_audit(
                        Some(group_id),
                        BATCH_SETTLEMENT_RECORDED,
                        json!({
                            "batch_id": batch_id,
                            "group_id": group_id,
                            "applied": requests.len()
                        }),
                        Some(recorded_by),
                    )
                    .await?;
                    for request in &requests {
                        self.notify(Notification::SettlementRecorded {
                            group_id: group_id.to_string(),
                            from_email: request.from_email.clone(),
                            to_email: request.to_email.clone(),
                            amount: request.amount,
                        })
                        .await;
                    }
                    return Ok(BatchSettleOutcome {
                        batch_id,
                        applied: requests.len(),
                    });
                }
                Err(SplitbookError::ConcurrentModification) => {
                    attempts += 1;
                    if attempts >= MAX_COMMIT_ATTEMPTS {
                        return Err(SplitbookError::ConcurrentModification);
                    }
                    debug!("Batch settlement CAS conflict in group {}, retrying", group_id);
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn settlement_history(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<Vec<SettlementRecord>, SplitbookError> {
        let group = self.active_group(group_id).await?;
        self.require_member(&group, queried_by)?;
        self.storage.settlement_records(group_id).await
    }

    // TRANSACTION SUMMARIES

    pub async fn create_summary(
        &self,
        group_id: &str,
        draft: SummaryDraft,
        created_by: &str,
    ) -> Result<TransactionSummary, SplitbookError> {
        info!("Creating summary in group {} by {}", group_id, created_by);
        let group = self.active_group(group_id).await?;
        self.require_member(&group, created_by)?;
        self.validate_string_input("description", &draft.description, MAX_DESCRIPTION_LEN)?;
        self.validate_amount(draft.amount)?;

        let (members_share_list, slice_type) = match &draft.slice {
            SliceSpec::Equal { members } => {
                for email in members {
                    if !group.is_member(email) {
                        return Err(SplitbookError::MemberNotInGroup(email.clone()));
                    }
                }
                let shares = split::equal_shares(draft.amount, members)?;
                (
                    shares
                        .into_iter()
                        .map(|s| MemberShare {
                            email: s.email,
                            share_amount: s.amount,
                        })
                        .collect::<Vec<_>>(),
                    SliceType::Equal,
                )
            }
            SliceSpec::Custom { shares } => {
                for share in shares {
                    if !group.is_member(&share.email) {
                        return Err(SplitbookError::MemberNotInGroup(share.email.clone()));
                    }
                    if share.share_amount < Decimal::ZERO || !is_cent_precise(share.share_amount) {
                        return Err(SplitbookError::InvalidAmount(share.share_amount));
                    }
                }
                let actual: Decimal = shares.iter().map(|s| s.share_amount).sum();
                if actual != draft.amount {
                    return Err(SplitbookError::SplitMismatch {
                        expected: draft.amount,
                        actual,
                    });
                }
                (shares.clone(), SliceType::Custom)
            }
        };

        let (contribution_list, contribution_type) = match &draft.contribution {
            // Everyone already paid their own share; the summary starts square.
            ContributionSpec::AllClear => (
                members_share_list
                    .iter()
                    .map(|s| Contribution {
                        email: s.email.clone(),
                        contributed_amount: s.share_amount,
                    })
                    .collect::<Vec<_>>(),
                ContributionType::AllClear,
            ),
            ContributionSpec::Custom { contributions } => {
                for contribution in contributions {
                    if !group.is_member(&contribution.email) {
                        return Err(SplitbookError::MemberNotInGroup(contribution.email.clone()));
                    }
                    if !is_cent_precise(contribution.contributed_amount) {
                        return Err(SplitbookError::InvalidAmount(contribution.contributed_amount));
                    }
                }
                let actual: Decimal = contributions.iter().map(|c| c.contributed_amount).sum();
                if actual != draft.amount {
                    return Err(SplitbookError::ContributionMismatch {
                        expected: draft.amount,
                        actual,
                    });
                }
                (contributions.clone(), ContributionType::Custom)
            }
        };

        let summary = TransactionSummary {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            description: draft.description,
            amount: draft.amount,
            contribution_type,
            slice_type,
            members_share_list,
            contribution_list,
            paybacks: Vec::new(),
            revision: 0,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        self.storage.save_summary(summary.clone()).await?;

        self.log_and_audit(
            Some(group_id),
            SUMMARY_CREATED,
            json!({ "summary_id": summary.id, "group_id": group_id, "amount": summary.amount }),
            Some(created_by),
        )
        .await?;
        Ok(summary)
    }

    /// Append a payback adjustment, capped so the payer can never pay back
    /// more than they still owe within the summary.
    pub async fn add_payback(
        &self,
        group_id: &str,
        summary_id: &str,
        from_email: &str,
        to_email: &str,
        amount: Decimal,
        recorded_by: &str,
    ) -> Result<Payback, SplitbookError> {
        info!(
            "Recording payback of {} from {} to {} on summary {}",
            amount, from_email, to_email, summary_id
        );
        let group = self.active_group(group_id).await?;
        self.require_member(&group, recorded_by)?;
        self.validate_amount(amount)?;
        if from_email == to_email {
            return Err(SplitbookError::SelfSettlement);
        }

        let mut attempts = 0;
        loop {
            let summary = self
                .storage
                .get_summary(group_id, summary_id)
                .await?
                .ok_or_else(|| SplitbookError::SummaryNotFound(summary_id.to_string()))?;
            for email in [from_email, to_email] {
                let listed = summary.members_share_list.iter().any(|s| s.email == email)
                    || summary.contribution_list.iter().any(|c| c.email == email);
                if !listed {
                    return Err(SplitbookError::MemberNotInGroup(email.to_string()));
                }
            }
            let outstanding = summary.outstanding(from_email);
            if amount > outstanding {
                return Err(SplitbookError::ExceedsOutstandingBalance { outstanding });
            }

            let payback = Payback {
                id: Uuid::new_v4().to_string(),
                from_email: from_email.to_string(),
                to_email: to_email.to_string(),
                amount,
                recorded_by: recorded_by.to_string(),
                created_at: Utc::now(),
            };
            match self
                .storage
                .append_payback(group_id, summary_id, summary.revision, payback.clone())
                .await
            {
                Ok(_) => {
                    self.log_and_audit(
                        Some(group_id),
                        PAYBACK_RECORDED,
                        json!({
                            "summary_id": summary_id,
                            "group_id": group_id,
                            "from_email": from_email,
                            "to_email": to_email,
                            "amount": amount
                        }),
                        Some(recorded_by),
                    )
                    .await?;
                    return Ok(payback);
                }
                Err(SplitbookError::ConcurrentModification) => {
                    attempts += 1;
                    if attempts >= MAX_COMMIT_ATTEMPTS {
                        return Err(SplitbookError::ConcurrentModification);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn get_summaries(
        &self,
        group_id: &str,
        queried_by: &str,
    ) -> Result<Vec<TransactionSummary>, SplitbookError> {
        let group = self.active_group(group_id).await?;
        self.require_member(&group, queried_by)?;
        self.storage.get_summaries(group_id).await
    }

    pub async fn summary_balances(
        &self,
        group_id: &str,
        summary_id: &str,
        queried_by: &str,
    ) -> Result<HashMap<String, Decimal>, SplitbookError> {
        let group = self.active_group(group_id).await?;
        self.require_member(&group, queried_by)?;
        let summary = self
            .storage
            .get_summary(group_id, summary_id)
            .await?
            .ok_or_else(|| SplitbookError::SummaryNotFound(summary_id.to_string()))?;
        Ok(summary.balances())
    }

    /// One-time migration of a summary into canonical ledger entries. The
    /// append and the summary deletion commit together; afterwards the
    /// summary no longer exists as a parallel balance path.
    pub async fn migrate_summary(
        &self,
        group_id: &str,
        summary_id: &str,
        migrated_by: &str,
    ) -> Result<Vec<LedgerEntry>, SplitbookError> {
        info!(
            "Migrating summary {} in group {} by {}",
            summary_id, group_id, migrated_by
        );
        let group = self.active_group(group_id).await?;
        self.require_member(&group, migrated_by)?;

        let mut attempts = 0;
        loop {
            let ledger = self.storage.ledger(group_id).await?;
            let summary = self
                .storage
                .get_summary(group_id, summary_id)
                .await?
                .ok_or_else(|| SplitbookError::SummaryNotFound(summary_id.to_string()))?;

            let (expense, settlements) = summary.to_ledger_entries(&group.currency, migrated_by);
            let mut entries = vec![LedgerEntry::Expense(expense)];
            entries.extend(settlements.into_iter().map(LedgerEntry::Settlement));

            match self
                .storage
                .migrate_summary(group_id, summary_id, ledger.version, entries.clone())
                .await
            {
                Ok(_) => {
                    self.log_and_audit(
                        Some(group_id),
                        SUMMARY_MIGRATED,
                        json!({
                            "summary_id": summary_id,
                            "group_id": group_id,
                            "entries": entries.len()
                        }),
                        Some(migrated_by),
                    )
                    .await?;
                    return Ok(entries);
                }
                Err(SplitbookError::ConcurrentModification) => {
                    attempts += 1;
                    if attempts >= MAX_COMMIT_ATTEMPTS {
                        return Err(SplitbookError::ConcurrentModification);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    // REPORTING

    pub async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, SplitbookError> {
        self.storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| SplitbookError::GroupNotFound(group_id.to_string()))?;
        self.storage.get_group_audits(group_id).await
    }

    pub async fn get_app_logs(&self) -> Result<Vec<AppLog>, SplitbookError> {
        self.logging.get_logs().await
    }
}
