use crate::directory::UNKNOWN_OWNER;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance for advisory total checks: taxes and fees are often not itemized.
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A (month, year) billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillPeriod {
    pub month: u32,
    pub year: i32,
}

impl BillPeriod {
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }
}

impl fmt::Display for BillPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCharge {
    /// Digits only.
    pub phone_number: String,
    pub owner: String,
    pub plan_charge: Decimal,
    pub equipment_charge: Decimal,
    pub one_time_charge: Decimal,
}

impl LineCharge {
    pub fn total(&self) -> Decimal {
        self.plan_charge + self.equipment_charge + self.one_time_charge
    }

    pub fn is_resolved(&self) -> bool {
        self.owner != UNKNOWN_OWNER
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub month: u32,
    pub year: i32,
    pub total_due: Decimal,
    pub plan_total: Decimal,
    pub equipment_total: Decimal,
    pub one_time_total: Decimal,
    pub lines: Vec<LineCharge>,
}

impl Bill {
    pub fn period(&self) -> BillPeriod {
        BillPeriod::new(self.month, self.year)
    }

    /// Sum of the three stated category totals.
    pub fn itemized_total(&self) -> Decimal {
        self.plan_total + self.equipment_total + self.one_time_total
    }

    /// Sum of every charge attached to a specific line.
    pub fn line_total(&self) -> Decimal {
        self.lines.iter().map(LineCharge::total).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeCategory {
    Plan,
    Equipment,
    OneTime,
}

impl fmt::Display for ChargeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChargeCategory::Plan => "plan",
            ChargeCategory::Equipment => "equipment",
            ChargeCategory::OneTime => "one-time",
        };
        f.write_str(name)
    }
}

/// Non-fatal findings collected while normalizing a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NormalizationWarning {
    UnresolvedOwner {
        phone_number: String,
    },
    TotalMismatch {
        stated: Decimal,
        itemized: Decimal,
    },
    CategoryMismatch {
        category: ChargeCategory,
        stated: Decimal,
        itemized: Decimal,
    },
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationWarning::UnresolvedOwner { phone_number } => write!(
                f,
                "phone number {} is not in the owner directory",
                phone_number
            ),
            NormalizationWarning::TotalMismatch { stated, itemized } => write!(
                f,
                "plan + equipment + one-time = ${:.2} but total due is ${:.2}",
                itemized, stated
            ),
            NormalizationWarning::CategoryMismatch {
                category,
                stated,
                itemized,
            } => write!(
                f,
                "{} charges on lines add up to ${:.2} but the bill states ${:.2}",
                category, itemized, stated
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBill {
    pub bill: Bill,
    pub warnings: Vec<NormalizationWarning>,
}

impl NormalizedBill {
    /// A bill with unresolved owners still flows through, but must be fixed
    /// up by hand before it can be considered settled.
    pub fn is_final(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, NormalizationWarning::UnresolvedOwner { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerShare {
    pub owner: String,
    pub line_charges: Decimal,
    pub equipment: Decimal,
    pub one_time: Decimal,
    /// Portion of plan-wide charges, including any rounding remainder.
    pub shared: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub shares: Vec<OwnerShare>,
    /// `total_due` minus every attributed line charge.
    pub residual: Decimal,
    /// Rounding cents moved onto `remainder_owner` so the shares reconcile.
    pub remainder: Decimal,
    pub remainder_owner: String,
}

impl Allocation {
    pub fn total(&self) -> Decimal {
        self.shares.iter().map(|s| s.subtotal).sum()
    }

    pub fn share_for(&self, owner: &str) -> Option<&OwnerShare> {
        self.shares.iter().find(|s| s.owner == owner)
    }
}
