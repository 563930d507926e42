// Audit action names, shared between the service and reporting.
pub const GROUP_CREATED: &str = "GROUP_CREATED";
pub const GROUP_RENAMED: &str = "GROUP_RENAMED";
pub const GROUP_DELETED: &str = "GROUP_DELETED";
pub const MEMBER_ADDED: &str = "MEMBER_ADDED";
pub const MEMBER_REMOVED: &str = "MEMBER_REMOVED";
pub const EXPENSE_ADDED: &str = "EXPENSE_ADDED";
pub const EXPENSE_UPDATED: &str = "EXPENSE_UPDATED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const SETTLEMENT_RECORDED: &str = "SETTLEMENT_RECORDED";
pub const BATCH_SETTLEMENT_RECORDED: &str = "BATCH_SETTLEMENT_RECORDED";
pub const SUMMARY_CREATED: &str = "SUMMARY_CREATED";
pub const PAYBACK_RECORDED: &str = "PAYBACK_RECORDED";
pub const SUMMARY_MIGRATED: &str = "SUMMARY_MIGRATED";
pub const BALANCE_QUERIED: &str = "BALANCE_QUERIED";

// Input limits.
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 255;
pub const MAX_AMOUNT: i64 = 1_000_000;

/// Optimistic-recheck attempts for settlement and payback writes before
/// giving up with `ConcurrentModification`.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;
