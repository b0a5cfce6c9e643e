use crate::error::{Result, SplitError};
use crate::model::{round_cents, Allocation, Bill, OwnerShare};
use log::{debug, warn};
use rust_decimal::Decimal;

/// Splits a validated bill into per-owner obligations.
///
/// Line-level charges stay with the line's owner. Whatever is left of
/// `total_due` (taxes, surcharges, account-level discounts, lines nobody
/// claims) is spread evenly across owners. Each owner's exact share is
/// rounded to the cent and the leftover cents go to the payer, so the
/// shares always add up to `total_due`.
pub struct ShareAllocator<'a> {
    payer: &'a str,
}

struct Accumulator {
    owner: String,
    line_charges: Decimal,
    equipment: Decimal,
    one_time: Decimal,
}

impl Accumulator {
    fn attributed(&self) -> Decimal {
        self.line_charges + self.equipment + self.one_time
    }
}

impl<'a> ShareAllocator<'a> {
    pub fn new(payer: &'a str) -> Self {
        Self { payer }
    }

    pub fn allocate(&self, bill: &Bill) -> Result<Allocation> {
        let owners = collect_owners(bill);
        if owners.is_empty() {
            return Err(SplitError::Allocation(format!(
                "none of the {} lines on bill {} belong to a known owner",
                bill.lines.len(),
                bill.period()
            )));
        }

        let attributed: Decimal = owners.iter().map(Accumulator::attributed).sum();
        let residual = bill.total_due - attributed;
        let per_owner = residual / Decimal::from(owners.len() as u64);

        debug!(
            "Bill {}: attributed ${:.2}, shared residual ${:.2} over {} owners",
            bill.period(),
            attributed,
            residual,
            owners.len()
        );

        let mut shares: Vec<OwnerShare> = owners
            .into_iter()
            .map(|acc| {
                let subtotal = round_cents(acc.attributed() + per_owner);
                OwnerShare {
                    shared: subtotal - acc.attributed(),
                    owner: acc.owner,
                    line_charges: acc.line_charges,
                    equipment: acc.equipment,
                    one_time: acc.one_time,
                    subtotal,
                }
            })
            .collect();

        let rounded: Decimal = shares.iter().map(|s| s.subtotal).sum();
        let remainder = bill.total_due - rounded;

        let idx = match shares.iter().position(|s| s.owner == self.payer) {
            Some(idx) => idx,
            None => {
                warn!(
                    "Payer '{}' has no line on bill {}; '{}' absorbs the rounding remainder",
                    self.payer,
                    bill.period(),
                    shares[0].owner
                );
                0
            }
        };

        let target = &mut shares[idx];
        target.shared += remainder;
        target.subtotal += remainder;
        let remainder_owner = target.owner.clone();

        Ok(Allocation {
            shares,
            residual,
            remainder,
            remainder_owner,
        })
    }
}

/// Resolved owners in order of first appearance, with their line charges.
fn collect_owners(bill: &Bill) -> Vec<Accumulator> {
    let mut owners: Vec<Accumulator> = Vec::new();

    for line in bill.lines.iter().filter(|l| l.is_resolved()) {
        let idx = match owners.iter().position(|o| o.owner == line.owner) {
            Some(idx) => idx,
            None => {
                owners.push(Accumulator {
                    owner: line.owner.clone(),
                    line_charges: Decimal::ZERO,
                    equipment: Decimal::ZERO,
                    one_time: Decimal::ZERO,
                });
                owners.len() - 1
            }
        };

        let acc = &mut owners[idx];
        acc.line_charges += line.plan_charge;
        acc.equipment += line.equipment_charge;
        acc.one_time += line.one_time_charge;
    }

    owners
}

pub fn allocate(bill: &Bill, payer: &str) -> Result<Allocation> {
    ShareAllocator::new(payer).allocate(bill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::UNKNOWN_OWNER;
    use crate::model::LineCharge;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(owner: &str, plan: &str, equipment: &str, one_time: &str) -> LineCharge {
        LineCharge {
            phone_number: "5550100000".to_string(),
            owner: owner.to_string(),
            plan_charge: dec(plan),
            equipment_charge: dec(equipment),
            one_time_charge: dec(one_time),
        }
    }

    fn bill(total_due: &str, lines: Vec<LineCharge>) -> Bill {
        Bill {
            month: 11,
            year: 2024,
            total_due: dec(total_due),
            plan_total: lines.iter().map(|l| l.plan_charge).sum(),
            equipment_total: lines.iter().map(|l| l.equipment_charge).sum(),
            one_time_total: lines.iter().map(|l| l.one_time_charge).sum(),
            lines,
        }
    }

    #[test]
    fn test_single_owner_pays_everything() {
        let b = bill(
            "87.13",
            vec![line("Alice", "40", "10", "0"), line("Alice", "30", "0", "2.5")],
        );
        let allocation = allocate(&b, "Alice").unwrap();

        assert_eq!(allocation.shares.len(), 1);
        let share = &allocation.shares[0];
        assert_eq!(share.line_charges, dec("70"));
        assert_eq!(share.equipment, dec("10"));
        assert_eq!(share.one_time, dec("2.5"));
        assert_eq!(share.subtotal, dec("87.13"));
    }

    #[test]
    fn test_line_charges_stay_with_their_owner() {
        let b = bill(
            "150.00",
            vec![
                line("Alice", "50", "20", "0"),
                line("Bob", "50", "0", "10"),
                line("Alice", "0", "0", "0"),
            ],
        );
        let allocation = allocate(&b, "Alice").unwrap();

        let owners: Vec<&str> = allocation.shares.iter().map(|s| s.owner.as_str()).collect();
        assert_eq!(owners, vec!["Alice", "Bob"]);

        // 150 - 130 attributed leaves 20 shared
        assert_eq!(allocation.residual, dec("20"));
        assert_eq!(allocation.share_for("Alice").unwrap().subtotal, dec("80.00"));
        assert_eq!(allocation.share_for("Bob").unwrap().subtotal, dec("70.00"));
        assert_eq!(allocation.remainder, Decimal::ZERO);
    }

    #[test]
    fn test_payer_absorbs_rounding_remainder() {
        let b = bill(
            "100.00",
            vec![
                line("Alice", "0", "0", "0"),
                line("Bob", "0", "0", "0"),
                line("Carol", "0", "0", "0"),
            ],
        );
        let allocation = allocate(&b, "Bob").unwrap();

        assert_eq!(allocation.share_for("Alice").unwrap().subtotal, dec("33.33"));
        assert_eq!(allocation.share_for("Bob").unwrap().subtotal, dec("33.34"));
        assert_eq!(allocation.share_for("Carol").unwrap().subtotal, dec("33.33"));
        assert_eq!(allocation.remainder, dec("0.01"));
        assert_eq!(allocation.remainder_owner, "Bob");
        assert_eq!(allocation.total(), dec("100.00"));
    }

    #[test]
    fn test_discount_reduces_every_share_evenly() {
        let b = bill(
            "100.00",
            vec![line("Alice", "60", "0", "0"), line("Bob", "50", "0", "0")],
        );
        let allocation = allocate(&b, "Alice").unwrap();

        assert_eq!(allocation.residual, dec("-10"));
        assert_eq!(allocation.share_for("Alice").unwrap().subtotal, dec("55.00"));
        assert_eq!(allocation.share_for("Bob").unwrap().subtotal, dec("45.00"));
        assert_eq!(allocation.share_for("Bob").unwrap().shared, dec("-5.00"));
    }

    #[test]
    fn test_unknown_lines_fold_into_shared_costs() {
        let b = bill(
            "60.00",
            vec![
                line("Alice", "20", "0", "0"),
                line(UNKNOWN_OWNER, "20", "0", "0"),
                line("Bob", "20", "0", "0"),
            ],
        );
        let allocation = allocate(&b, "Alice").unwrap();

        assert_eq!(allocation.shares.len(), 2);
        assert!(allocation.share_for(UNKNOWN_OWNER).is_none());
        assert_eq!(allocation.share_for("Alice").unwrap().subtotal, dec("30.00"));
        assert_eq!(allocation.share_for("Bob").unwrap().subtotal, dec("30.00"));
    }

    #[test]
    fn test_all_unknown_is_an_error() {
        let b = bill("10.00", vec![line(UNKNOWN_OWNER, "10", "0", "0")]);
        assert!(matches!(
            allocate(&b, "Alice"),
            Err(SplitError::Allocation(_))
        ));
    }

    #[test]
    fn test_missing_payer_falls_back_to_first_owner() {
        let b = bill(
            "10.00",
            vec![
                line("Alice", "0", "0", "0"),
                line("Bob", "0", "0", "0"),
                line("Carol", "0", "0", "0"),
            ],
        );
        let allocation = allocate(&b, "Zed").unwrap();
        assert_eq!(allocation.remainder_owner, "Alice");
        assert_eq!(allocation.share_for("Alice").unwrap().subtotal, dec("3.34"));
        assert_eq!(allocation.total(), dec("10.00"));
    }

    #[test]
    fn test_shares_reconcile_across_many_totals() {
        for cents in 0..500u32 {
            let total = Decimal::new(12_345 + i64::from(cents) * 7, 2);
            let mut b = bill(
                "0",
                vec![
                    line("Alice", "21.17", "0", "0"),
                    line("Bob", "21.17", "3.33", "0"),
                    line("Carol", "21.17", "0", "1.01"),
                ],
            );
            b.total_due = total;

            let first = allocate(&b, "Carol").unwrap();
            let second = allocate(&b, "Carol").unwrap();
            assert_eq!(first, second);
            assert_eq!(first.total(), total, "shares must reconcile for {}", total);
            for share in &first.shares {
                assert_eq!(
                    share.subtotal,
                    share.line_charges + share.equipment + share.one_time + share.shared
                );
                assert_eq!(share.subtotal.round_dp(2), share.subtotal);
            }
        }
    }
}
