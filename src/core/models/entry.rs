use super::expense::Expense;
use super::settlement::Settlement;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LedgerEntry {
    Expense(Expense),
    Settlement(Settlement),
}

impl LedgerEntry {
    pub fn id(&self) -> &str {
        match self {
            LedgerEntry::Expense(e) => &e.id,
            LedgerEntry::Settlement(s) => &s.id,
        }
    }

    pub fn group_id(&self) -> &str {
        match self {
            LedgerEntry::Expense(e) => &e.group_id,
            LedgerEntry::Settlement(s) => &s.group_id,
        }
    }

    pub fn as_expense(&self) -> Option<&Expense> {
        match self {
            LedgerEntry::Expense(e) => Some(e),
            LedgerEntry::Settlement(_) => None,
        }
    }
}
