//! Share derivation and validation for expense splits.

use crate::core::errors::SplitbookError;
use crate::core::models::expense::Share;
use crate::money::{is_cent_precise, round_half_up};
use rust_decimal::Decimal;

/// Equal split across `members`, each share rounded to two decimals. The
/// rounding remainder is absorbed by the last member in the caller-supplied
/// order, so the shares always sum to `amount` exactly.
pub fn equal_shares(amount: Decimal, members: &[String]) -> Result<Vec<Share>, SplitbookError> {
    if members.is_empty() {
        return Err(SplitbookError::EmptySplit);
    }
    let per_member = round_half_up(amount / Decimal::from(members.len() as u64));
    let mut shares: Vec<Share> = members
        .iter()
        .map(|email| Share {
            email: email.clone(),
            amount: per_member,
        })
        .collect();
    let assigned = per_member * Decimal::from(members.len() as u64 - 1);
    if let Some(last) = shares.last_mut() {
        last.amount = amount - assigned;
    }
    Ok(shares)
}

/// Custom shares must be cent-precise, non-negative, and sum to the total
/// exactly. No rounding slack: a mismatch rejects the write.
pub fn validate_custom(shares: &[Share], total: Decimal) -> Result<(), SplitbookError> {
    if shares.is_empty() {
        return Err(SplitbookError::EmptySplit);
    }
    for share in shares {
        if share.amount < Decimal::ZERO || !is_cent_precise(share.amount) {
            return Err(SplitbookError::InvalidAmount(share.amount));
        }
    }
    let actual: Decimal = shares.iter().map(|s| s.amount).sum();
    if actual != total {
        return Err(SplitbookError::SplitMismatch {
            expected: total,
            actual,
        });
    }
    Ok(())
}

/// Proportionally rescale amounts that summed to `old_total` onto
/// `new_total` (after currency conversion), preserving the exact-sum
/// invariant: each part rounds half-up, the remainder lands on the last.
pub fn rescale(amounts: &[Decimal], old_total: Decimal, new_total: Decimal) -> Vec<Decimal> {
    if amounts.is_empty() || old_total.is_zero() || old_total == new_total {
        return amounts.to_vec();
    }
    let mut out: Vec<Decimal> = amounts
        .iter()
        .map(|a| round_half_up(*a * new_total / old_total))
        .collect();
    let assigned: Decimal = out.iter().take(out.len() - 1).copied().sum();
    if let Some(last) = out.last_mut() {
        *last = new_total - assigned;
    }
    out
}
