pub mod audit;
pub mod balance;
pub mod entry;
pub mod expense;
pub mod group;
pub mod settlement;
pub mod summary;

pub use audit::{AppLog, GroupAudit};
pub use balance::{MemberBalance, Transfer};
pub use entry::LedgerEntry;
pub use expense::{Expense, PaidBy, Payment, Share, ShareWith, SplitKind};
pub use group::{Group, GroupMember, Role};
pub use settlement::{Settlement, SettlementKind, SettlementRecord};
pub use summary::{
    Contribution, ContributionSpec, ContributionType, MemberShare, Payback, SliceSpec, SliceType,
    TransactionSummary,
};
