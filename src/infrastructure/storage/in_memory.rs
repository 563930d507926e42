use crate::core::errors::SplitbookError;
use crate::core::models::{
    audit::GroupAudit, entry::LedgerEntry, group::Group, settlement::SettlementRecord,
    summary::Payback, summary::TransactionSummary,
};
use crate::infrastructure::storage::{Storage, VersionedLedger};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct GroupLedger {
    version: u64,
    entries: Vec<LedgerEntry>,
    records: Vec<SettlementRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    groups: Arc<RwLock<HashMap<String, Group>>>,
    ledgers: Arc<RwLock<HashMap<String, GroupLedger>>>,
    summaries: Arc<RwLock<HashMap<String, TransactionSummary>>>,
    group_audits: Arc<RwLock<HashMap<String, Vec<GroupAudit>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save_group(&self, group: Group) -> Result<(), SplitbookError> {
        // Enforce the (group, member email) unique constraint here, the way
        // a database index would.
        let mut seen = HashSet::new();
        for member in &group.members {
            if !seen.insert(member.email.as_str()) {
                return Err(SplitbookError::MemberAlreadyExists(member.email.clone()));
            }
        }
        let mut groups = self.groups.write().await;
        groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, SplitbookError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn delete_group(&self, group_id: &str) -> Result<(), SplitbookError> {
        let mut groups = self.groups.write().await;
        let mut ledgers = self.ledgers.write().await;
        let mut summaries = self.summaries.write().await;
        if let Some(group) = groups.get_mut(group_id) {
            group.deleted = true;
        }
        ledgers.remove(group_id);
        summaries.retain(|_, s| s.group_id != group_id);
        Ok(())
    }

    async fn get_member_groups(&self, email: &str) -> Result<Vec<Group>, SplitbookError> {
        let groups = self.groups.read().await;
        Ok(groups
            .values()
            .filter(|g| !g.deleted && g.is_member(email))
            .cloned()
            .collect())
    }

    async fn is_group_member(&self, group_id: &str, email: &str) -> Result<bool, SplitbookError> {
        let groups = self.groups.read().await;
        Ok(groups
            .get(group_id)
            .map(|g| !g.deleted && g.is_member(email))
            .unwrap_or(false))
    }

    async fn ledger(&self, group_id: &str) -> Result<VersionedLedger, SplitbookError> {
        let ledgers = self.ledgers.read().await;
        Ok(ledgers
            .get(group_id)
            .map(|l| VersionedLedger {
                version: l.version,
                entries: l.entries.clone(),
            })
            .unwrap_or(VersionedLedger {
                version: 0,
                entries: Vec::new(),
            }))
    }

    async fn get_entry(
        &self,
        group_id: &str,
        entry_id: &str,
    ) -> Result<Option<LedgerEntry>, SplitbookError> {
        let ledgers = self.ledgers.read().await;
        Ok(ledgers
            .get(group_id)
            .and_then(|l| l.entries.iter().find(|e| e.id() == entry_id).cloned()))
    }

    async fn append_entries(
        &self,
        group_id: &str,
        expected_version: u64,
        entries: Vec<LedgerEntry>,
        records: Vec<SettlementRecord>,
    ) -> Result<u64, SplitbookError> {
        let mut ledgers = self.ledgers.write().await;
        let ledger = ledgers.entry(group_id.to_string()).or_default();
        if ledger.version != expected_version {
            return Err(SplitbookError::ConcurrentModification);
        }
        ledger.entries.extend(entries);
        ledger.records.extend(records);
        ledger.version += 1;
        Ok(ledger.version)
    }

    async fn replace_entry(
        &self,
        group_id: &str,
        expected_version: u64,
        entry: LedgerEntry,
    ) -> Result<u64, SplitbookError> {
        let mut ledgers = self.ledgers.write().await;
        let ledger = ledgers
            .get_mut(group_id)
            .ok_or_else(|| SplitbookError::EntryNotFound(entry.id().to_string()))?;
        if ledger.version != expected_version {
            return Err(SplitbookError::ConcurrentModification);
        }
        let slot = ledger
            .entries
            .iter_mut()
            .find(|e| e.id() == entry.id())
            .ok_or_else(|| SplitbookError::EntryNotFound(entry.id().to_string()))?;
        *slot = entry;
        ledger.version += 1;
        Ok(ledger.version)
    }

    async fn settlement_records(
        &self,
        group_id: &str,
    ) -> Result<Vec<SettlementRecord>, SplitbookError> {
        let ledgers = self.ledgers.read().await;
        Ok(ledgers
            .get(group_id)
            .map(|l| l.records.clone())
            .unwrap_or_default())
    }

    async fn save_summary(&self, summary: TransactionSummary) -> Result<(), SplitbookError> {
        let mut summaries = self.summaries.write().await;
        summaries.insert(summary.id.clone(), summary);
        Ok(())
    }

    async fn get_summary(
        &self,
        group_id: &str,
        summary_id: &str,
    ) -> Result<Option<TransactionSummary>, SplitbookError> {
        let summaries = self.summaries.read().await;
        Ok(summaries
            .get(summary_id)
            .filter(|s| s.group_id == group_id)
            .cloned())
    }

    async fn get_summaries(
        &self,
        group_id: &str,
    ) -> Result<Vec<TransactionSummary>, SplitbookError> {
        let summaries = self.summaries.read().await;
        Ok(summaries
            .values()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn append_payback(
        &self,
        group_id: &str,
        summary_id: &str,
        expected_revision: u64,
        payback: Payback,
    ) -> Result<u64, SplitbookError> {
        let mut summaries = self.summaries.write().await;
        let summary = summaries
            .get_mut(summary_id)
            .filter(|s| s.group_id == group_id)
            .ok_or_else(|| SplitbookError::SummaryNotFound(summary_id.to_string()))?;
        if summary.revision != expected_revision {
            return Err(SplitbookError::ConcurrentModification);
        }
        summary.paybacks.push(payback);
        summary.revision += 1;
        Ok(summary.revision)
    }

    async fn migrate_summary(
        &self,
        group_id: &str,
        summary_id: &str,
        expected_version: u64,
        entries: Vec<LedgerEntry>,
    ) -> Result<u64, SplitbookError> {
        let mut ledgers = self.ledgers.write().await;
        let mut summaries = self.summaries.write().await;
        if summaries
            .get(summary_id)
            .filter(|s| s.group_id == group_id)
            .is_none()
        {
            return Err(SplitbookError::SummaryNotFound(summary_id.to_string()));
        }
        let ledger = ledgers.entry(group_id.to_string()).or_default();
        if ledger.version != expected_version {
            return Err(SplitbookError::ConcurrentModification);
        }
        ledger.entries.extend(entries);
        ledger.version += 1;
        summaries.remove(summary_id);
        Ok(ledger.version)
    }

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), SplitbookError> {
        let mut group_audits = self.group_audits.write().await;
        group_audits
            .entry(audit.group_id.clone())
            .or_insert_with(Vec::new)
            .push(audit);
        Ok(())
    }

    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, SplitbookError> {
        let group_audits = self.group_audits.read().await;
        Ok(group_audits.get(group_id).cloned().unwrap_or_default())
    }
}
