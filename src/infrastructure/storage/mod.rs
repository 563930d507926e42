use crate::core::errors::SplitbookError;
use crate::core::models::{
    audit::GroupAudit, entry::LedgerEntry, group::Group, settlement::SettlementRecord,
    summary::Payback, summary::TransactionSummary,
};
use async_trait::async_trait;

/// A group's entry history plus the version the read was made at. Writers
/// pass the version back so storage can reject lost updates.
#[derive(Clone, Debug)]
pub struct VersionedLedger {
    pub version: u64,
    pub entries: Vec<LedgerEntry>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn save_group(&self, group: Group) -> Result<(), SplitbookError>;
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, SplitbookError>;
    /// Marks the group deleted and cascades: ledger entries, settlement
    /// records and summaries are dropped. Audit records are retained.
    async fn delete_group(&self, group_id: &str) -> Result<(), SplitbookError>;
    async fn get_member_groups(&self, email: &str) -> Result<Vec<Group>, SplitbookError>;
    async fn is_group_member(&self, group_id: &str, email: &str) -> Result<bool, SplitbookError>;

    async fn ledger(&self, group_id: &str) -> Result<VersionedLedger, SplitbookError>;
    async fn get_entry(
        &self,
        group_id: &str,
        entry_id: &str,
    ) -> Result<Option<LedgerEntry>, SplitbookError>;
    /// Commits entries and settlement-history records in one transaction,
    /// iff the ledger is still at `expected_version`. A mismatch fails with
    /// `ConcurrentModification` and writes nothing.
    async fn append_entries(
        &self,
        group_id: &str,
        expected_version: u64,
        entries: Vec<LedgerEntry>,
        records: Vec<SettlementRecord>,
    ) -> Result<u64, SplitbookError>;
    /// CAS replacement of an existing entry (expense update / soft delete).
    async fn replace_entry(
        &self,
        group_id: &str,
        expected_version: u64,
        entry: LedgerEntry,
    ) -> Result<u64, SplitbookError>;
    async fn settlement_records(
        &self,
        group_id: &str,
    ) -> Result<Vec<SettlementRecord>, SplitbookError>;

    async fn save_summary(&self, summary: TransactionSummary) -> Result<(), SplitbookError>;
    async fn get_summary(
        &self,
        group_id: &str,
        summary_id: &str,
    ) -> Result<Option<TransactionSummary>, SplitbookError>;
    async fn get_summaries(
        &self,
        group_id: &str,
    ) -> Result<Vec<TransactionSummary>, SplitbookError>;
    /// Appends a payback iff the summary is still at `expected_revision`.
    async fn append_payback(
        &self,
        group_id: &str,
        summary_id: &str,
        expected_revision: u64,
        payback: Payback,
    ) -> Result<u64, SplitbookError>;
    /// Appends the migrated entries and deletes the summary in one
    /// transaction, guarded by the ledger version.
    async fn migrate_summary(
        &self,
        group_id: &str,
        summary_id: &str,
        expected_version: u64,
        entries: Vec<LedgerEntry>,
    ) -> Result<u64, SplitbookError>;

    async fn save_group_audit(&self, audit: GroupAudit) -> Result<(), SplitbookError>;
    async fn get_group_audits(&self, group_id: &str) -> Result<Vec<GroupAudit>, SplitbookError>;
}

pub mod in_memory;
