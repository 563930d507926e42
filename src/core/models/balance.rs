use rust_decimal::Decimal;
use serde::Serialize;

/// Derived position of one member. Never stored; recomputed on every read so
/// it always reflects the full current entry set.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct MemberBalance {
    /// Total contributed across expenses, adjusted by settlements.
    pub paid: Decimal,
    /// Total share obligation across expenses.
    pub owes: Decimal,
    /// `paid - owes`; positive means the group owes this member.
    pub net: Decimal,
}

/// One leg of a suggested payoff plan.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Transfer {
    pub from_email: String,
    pub to_email: String,
    pub amount: Decimal,
}
