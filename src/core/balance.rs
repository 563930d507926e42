//! The balance engine: derives who-owes-whom from a group's entry history.

use crate::core::models::balance::{MemberBalance, Transfer};
use crate::core::models::entry::LedgerEntry;
use crate::core::models::expense::Expense;
use crate::core::models::settlement::Settlement;
use crate::money::round_half_up;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Net positions derived from a group's full entry history.
///
/// Pure: a function of the entry list only, recomputed on every read. The
/// sum of all nets is zero at every prefix of history (conservation).
#[derive(Clone, Debug, Default)]
pub struct BalanceSheet {
    balances: HashMap<String, MemberBalance>,
    /// Signed pairwise debt keyed on the ordered email pair; a positive
    /// value means the lower-sorting email owes the higher-sorting one.
    pairs: HashMap<(String, String), Decimal>,
}

impl BalanceSheet {
    pub fn compute(entries: &[LedgerEntry]) -> Self {
        let mut sheet = BalanceSheet::default();
        for entry in entries {
            match entry {
                LedgerEntry::Expense(expense) if !expense.is_deleted() => {
                    sheet.apply_expense(expense);
                }
                LedgerEntry::Expense(_) => {}
                LedgerEntry::Settlement(settlement) => sheet.apply_settlement(settlement),
            }
        }
        for balance in sheet.balances.values_mut() {
            balance.net = balance.paid - balance.owes;
        }
        sheet
    }

    fn apply_expense(&mut self, expense: &Expense) {
        let payments = expense.payments();
        let total: Decimal = payments.iter().map(|(_, amount)| *amount).sum();
        for (payer, amount) in &payments {
            self.entry(payer).paid += *amount;
        }
        for share in &expense.shares {
            self.entry(&share.email).owes += share.amount;
            if total.is_zero() {
                continue;
            }
            // The share is owed to the payers weighted by their fraction of
            // the total, remainder on the last payer.
            let mut assigned = Decimal::ZERO;
            for (i, (payer, paid_amount)) in payments.iter().enumerate() {
                let portion = if i + 1 == payments.len() {
                    share.amount - assigned
                } else {
                    round_half_up(share.amount * *paid_amount / total)
                };
                assigned += portion;
                if *payer != share.email && !portion.is_zero() {
                    self.add_pair_debt(&share.email, payer, portion);
                }
            }
        }
    }

    fn apply_settlement(&mut self, settlement: &Settlement) {
        self.record_settlement(
            &settlement.from_email,
            &settlement.to_email,
            settlement.amount,
        );
    }

    /// Absorb a settlement of `amount` from debtor to creditor: the debtor
    /// paid money into the group, the creditor received it.
    pub fn record_settlement(&mut self, from: &str, to: &str, amount: Decimal) {
        let from_balance = self.entry(from);
        from_balance.paid += amount;
        from_balance.net += amount;
        let to_balance = self.entry(to);
        to_balance.paid -= amount;
        to_balance.net -= amount;
        self.add_pair_debt(from, to, -amount);
    }

    fn entry(&mut self, email: &str) -> &mut MemberBalance {
        self.balances.entry(email.to_string()).or_default()
    }

    fn add_pair_debt(&mut self, debtor: &str, creditor: &str, amount: Decimal) {
        let (key, signed) = if debtor < creditor {
            ((debtor.to_string(), creditor.to_string()), amount)
        } else {
            ((creditor.to_string(), debtor.to_string()), -amount)
        };
        *self.pairs.entry(key).or_default() += signed;
    }

    pub fn balances(&self) -> &HashMap<String, MemberBalance> {
        &self.balances
    }

    pub fn member(&self, email: &str) -> MemberBalance {
        self.balances.get(email).cloned().unwrap_or_default()
    }

    pub fn net(&self, email: &str) -> Decimal {
        self.member(email).net
    }

    /// True when the email has ever appeared in the history, member or not.
    pub fn is_participant(&self, email: &str) -> bool {
        self.balances.contains_key(email)
    }

    /// How much `from` still owes `to`, pairwise; zero when square.
    pub fn outstanding_between(&self, from: &str, to: &str) -> Decimal {
        let debt = if from < to {
            self.pairs
                .get(&(from.to_string(), to.to_string()))
                .copied()
                .unwrap_or_default()
        } else {
            -self
                .pairs
                .get(&(to.to_string(), from.to_string()))
                .copied()
                .unwrap_or_default()
        };
        debt.max(Decimal::ZERO)
    }

    pub fn total_net(&self) -> Decimal {
        self.balances.values().map(|b| b.net).sum()
    }

    /// Greedy creditor/debtor matching producing a short payoff plan.
    /// Deterministic: both sides are ordered by amount, then email.
    pub fn suggested_transfers(&self) -> Vec<Transfer> {
        let mut creditors: Vec<(String, Decimal)> = self
            .balances
            .iter()
            .filter(|(_, b)| b.net > Decimal::ZERO)
            .map(|(email, b)| (email.clone(), b.net))
            .collect();
        let mut debtors: Vec<(String, Decimal)> = self
            .balances
            .iter()
            .filter(|(_, b)| b.net < Decimal::ZERO)
            .map(|(email, b)| (email.clone(), -b.net))
            .collect();

        creditors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        debtors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut transfers = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < debtors.len() && j < creditors.len() {
            let amount = debtors[i].1.min(creditors[j].1);
            if amount > Decimal::ZERO {
                transfers.push(Transfer {
                    from_email: debtors[i].0.clone(),
                    to_email: creditors[j].0.clone(),
                    amount,
                });
            }
            debtors[i].1 -= amount;
            creditors[j].1 -= amount;
            if debtors[i].1.is_zero() {
                i += 1;
            }
            if creditors[j].1.is_zero() {
                j += 1;
            }
        }
        transfers
    }
}
