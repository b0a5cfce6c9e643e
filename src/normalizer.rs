//! Turns an extraction draft into a validated [`Bill`].
//!
//! The extraction model is best-effort; nothing it produces reaches the
//! allocator without passing through here.

use crate::directory::{canonicalize_phone, OwnerDirectory, UNKNOWN_OWNER};
use crate::error::{Result, SplitError};
use crate::model::{
    round_cents, Bill, ChargeCategory, LineCharge, NormalizationWarning, NormalizedBill,
    TOTAL_TOLERANCE,
};
use crate::schema::{BillDraft, LineDraft};
use chrono::Month;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

pub fn normalize(draft: &BillDraft, directory: &OwnerDirectory) -> Result<NormalizedBill> {
    let month = parse_month(draft.month.as_ref())?;
    let year = parse_year(draft.year.as_ref())?;

    let total_due = parse_amount("total_due", draft.total_due.as_ref())?;
    let plan_total = parse_amount("plan_total", draft.plan_total.as_ref())?;
    let equipment_total = parse_amount("equipment_total", draft.equipment_total.as_ref())?;
    let one_time_total = parse_amount("one_time_total", draft.one_time_total.as_ref())?;

    let raw_lines = match draft.lines.as_ref() {
        Some(Value::Array(items)) if !items.is_empty() => items,
        Some(Value::Array(_)) | None | Some(Value::Null) => {
            return Err(SplitError::validation("lines", "bill has no phone lines"))
        }
        Some(other) => {
            return Err(SplitError::validation(
                "lines",
                format!("expected a list of lines, got {}", other),
            ))
        }
    };

    let mut warnings = Vec::new();
    let mut lines = Vec::with_capacity(raw_lines.len());

    for (idx, raw) in raw_lines.iter().enumerate() {
        let field = format!("lines[{}]", idx);
        let line: LineDraft = serde_json::from_value(raw.clone())
            .map_err(|e| SplitError::validation(&field, e.to_string()))?;

        let line = normalize_line(&field, &line, directory, &mut warnings)?;
        lines.push(line);
    }

    let bill = Bill {
        month,
        year,
        total_due,
        plan_total,
        equipment_total,
        one_time_total,
        lines,
    };

    check_totals(&bill, &mut warnings);

    for warning in &warnings {
        warn!("Bill {}: {}", bill.period(), warning);
    }
    debug!(
        "Normalized bill {} with {} lines and {} warnings",
        bill.period(),
        bill.lines.len(),
        warnings.len()
    );

    Ok(NormalizedBill { bill, warnings })
}

fn normalize_line(
    field: &str,
    line: &LineDraft,
    directory: &OwnerDirectory,
    warnings: &mut Vec<NormalizationWarning>,
) -> Result<LineCharge> {
    let raw_phone = match line.phone_number.as_ref() {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let phone_number = canonicalize_phone(&raw_phone);
    if phone_number.is_empty() {
        return Err(SplitError::validation(
            format!("{}.phone_number", field),
            format!("no digits in '{}'", raw_phone),
        ));
    }

    let owner = match directory.lookup(&phone_number) {
        Some(owner) => owner.to_string(),
        None => {
            warnings.push(NormalizationWarning::UnresolvedOwner {
                phone_number: phone_number.clone(),
            });
            UNKNOWN_OWNER.to_string()
        }
    };

    Ok(LineCharge {
        plan_charge: parse_amount(
            &format!("{}.plan_charge", field),
            line.plan_charge.as_ref(),
        )?,
        equipment_charge: parse_amount(
            &format!("{}.equipment_charge", field),
            line.equipment_charge.as_ref(),
        )?,
        one_time_charge: parse_amount(
            &format!("{}.one_time_charge", field),
            line.one_time_charge.as_ref(),
        )?,
        phone_number,
        owner,
    })
}

fn check_totals(bill: &Bill, warnings: &mut Vec<NormalizationWarning>) {
    let itemized = bill.itemized_total();
    if (itemized - bill.total_due).abs() > TOTAL_TOLERANCE {
        warnings.push(NormalizationWarning::TotalMismatch {
            stated: bill.total_due,
            itemized,
        });
    }

    let categories = [
        (
            ChargeCategory::Plan,
            bill.plan_total,
            bill.lines.iter().map(|l| l.plan_charge).sum::<Decimal>(),
        ),
        (
            ChargeCategory::Equipment,
            bill.equipment_total,
            bill.lines.iter().map(|l| l.equipment_charge).sum(),
        ),
        (
            ChargeCategory::OneTime,
            bill.one_time_total,
            bill.lines.iter().map(|l| l.one_time_charge).sum(),
        ),
    ];

    for (category, stated, itemized) in categories {
        if (stated - itemized).abs() > TOTAL_TOLERANCE {
            warnings.push(NormalizationWarning::CategoryMismatch {
                category,
                stated,
                itemized,
            });
        }
    }
}

/// Largest single amount accepted from a draft. Anything above it is a
/// misread, and keeping amounts this small means bill sums cannot overflow.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Missing values are zero; negative values and values above [`MAX_AMOUNT`]
/// are rejected.
pub fn parse_amount(field: &str, value: Option<&Value>) -> Result<Decimal> {
    let amount = match value {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(Value::Number(n)) => decimal_from_str(&n.to_string())
            .ok_or_else(|| SplitError::validation(field, format!("'{}' is not an amount", n)))?,
        Some(Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
                .collect();
            if cleaned.is_empty() {
                Decimal::ZERO
            } else {
                decimal_from_str(&cleaned).ok_or_else(|| {
                    SplitError::validation(field, format!("'{}' is not an amount", s))
                })?
            }
        }
        Some(other) => {
            return Err(SplitError::validation(
                field,
                format!("expected an amount, got {}", other),
            ))
        }
    };

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(SplitError::validation(
            field,
            format!("negative charge {}", amount),
        ));
    }

    if amount > MAX_AMOUNT {
        return Err(SplitError::validation(
            field,
            format!("amount {} exceeds {}", amount, MAX_AMOUNT),
        ));
    }

    Ok(round_cents(amount))
}

/// Whole JSON numbers, including floats such as `11.0`.
fn integral_number(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
            .map(|f| f as i64)
    })
}

fn decimal_from_str(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_month(value: Option<&Value>) -> Result<u32> {
    let month = match value {
        Some(Value::Number(n)) => integral_number(n).and_then(|m| u32::try_from(m).ok()),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u32>()
                .ok()
                .or_else(|| Month::from_str(s).ok().map(|m| m.number_from_month()))
        }
        None | Some(Value::Null) => {
            return Err(SplitError::validation("month", "missing"));
        }
        _ => None,
    };

    match month {
        Some(m) if (1..=12).contains(&m) => Ok(m),
        _ => Err(SplitError::validation(
            "month",
            format!("'{}' is not a month", display_value(value)),
        )),
    }
}

fn parse_year(value: Option<&Value>) -> Result<i32> {
    let year = match value {
        Some(Value::Number(n)) => integral_number(n),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        None | Some(Value::Null) => {
            return Err(SplitError::validation("year", "missing"));
        }
        _ => None,
    };

    match year {
        Some(y) if (1000..=9999).contains(&y) => Ok(y as i32),
        _ => Err(SplitError::validation(
            "year",
            format!("'{}' is not a 4-digit year", display_value(value)),
        )),
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn directory() -> OwnerDirectory {
        OwnerDirectory::from_pairs([("123-456-7890", "Alice"), ("555-010-2000", "Bob")])
    }

    fn draft(value: serde_json::Value) -> BillDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_clean_draft_normalizes_without_warnings() {
        let d = draft(json!({
            "month": 11, "year": 2024, "total_due": "$100.00",
            "plan_total": 80, "equipment_total": "20.00",
            "lines": [
                {"phone_number": "(123) 456-7890", "plan_charge": 40, "equipment_charge": 20},
                {"phone_number": "5550102000", "plan_charge": "40.00"}
            ]
        }));

        let normalized = normalize(&d, &directory()).unwrap();
        assert!(normalized.warnings.is_empty(), "{:?}", normalized.warnings);
        assert!(normalized.is_final());

        let bill = normalized.bill;
        assert_eq!(bill.month, 11);
        assert_eq!(bill.year, 2024);
        assert_eq!(bill.total_due, dec("100.00"));
        assert_eq!(bill.one_time_total, Decimal::ZERO);
        assert_eq!(bill.lines[0].phone_number, "1234567890");
        assert_eq!(bill.lines[0].owner, "Alice");
        assert_eq!(bill.lines[1].owner, "Bob");
        assert_eq!(bill.lines[1].equipment_charge, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_number_is_kept_and_flagged() {
        let d = draft(json!({
            "month": "11", "year": "2024", "total_due": 10, "plan_total": 10,
            "lines": [{"phone": "999-999-9999", "line_amount": 10}]
        }));

        let normalized = normalize(&d, &directory()).unwrap();
        assert_eq!(normalized.bill.lines.len(), 1);
        assert_eq!(normalized.bill.lines[0].owner, UNKNOWN_OWNER);
        assert_eq!(
            normalized.warnings,
            vec![NormalizationWarning::UnresolvedOwner {
                phone_number: "9999999999".to_string()
            }]
        );
        assert!(!normalized.is_final());
    }

    #[test]
    fn test_negative_charge_names_the_field() {
        let d = draft(json!({
            "month": 1, "year": 2025, "total_due": 10,
            "lines": [
                {"phone_number": "1234567890", "plan_charge": 10},
                {"phone_number": "5550102000", "one_time_charge": -5}
            ]
        }));

        match normalize(&d, &directory()).unwrap_err() {
            SplitError::Validation { field, .. } => {
                assert_eq!(field, "lines[1].one_time_charge")
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_total_mismatch_is_advisory() {
        let d = draft(json!({
            "month": "November", "year": 2024, "total_due": 110,
            "plan_total": 100,
            "lines": [{"phone_number": "1234567890", "plan_charge": 100}]
        }));

        let normalized = normalize(&d, &directory()).unwrap();
        assert_eq!(normalized.bill.month, 11);
        assert_eq!(
            normalized.warnings,
            vec![NormalizationWarning::TotalMismatch {
                stated: dec("110"),
                itemized: dec("100")
            }]
        );
        assert!(normalized.is_final());
    }

    #[test]
    fn test_mismatch_within_tolerance_is_silent() {
        let d = draft(json!({
            "month": 2, "year": 2025, "total_due": 100.04, "plan_total": 100,
            "lines": [{"phone_number": "1234567890", "plan_charge": 100}]
        }));
        assert!(normalize(&d, &directory()).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_line_sums_checked_against_categories() {
        let d = draft(json!({
            "month": 2, "year": 2025, "total_due": 60, "plan_total": 40,
            "equipment_total": 20,
            "lines": [{"phone_number": "1234567890", "plan_charge": 40, "equipment_charge": 5}]
        }));

        let warnings = normalize(&d, &directory()).unwrap().warnings;
        assert_eq!(
            warnings,
            vec![NormalizationWarning::CategoryMismatch {
                category: ChargeCategory::Equipment,
                stated: dec("20"),
                itemized: dec("5")
            }]
        );
    }

    #[test]
    fn test_structural_failures() {
        let no_lines = draft(json!({"month": 1, "year": 2025, "total_due": 1, "lines": []}));
        assert!(matches!(
            normalize(&no_lines, &directory()),
            Err(SplitError::Validation { ref field, .. }) if field == "lines"
        ));

        let bad_month = draft(json!({"month": 13, "year": 2025, "lines": [{"phone": "1"}]}));
        assert!(matches!(
            normalize(&bad_month, &directory()),
            Err(SplitError::Validation { ref field, .. }) if field == "month"
        ));

        let short_year = draft(json!({"month": 1, "year": "24", "lines": [{"phone": "1"}]}));
        assert!(matches!(
            normalize(&short_year, &directory()),
            Err(SplitError::Validation { ref field, .. }) if field == "year"
        ));

        let no_phone = draft(json!({"month": 1, "year": 2025, "lines": [{"plan_charge": 3}]}));
        assert!(matches!(
            normalize(&no_phone, &directory()),
            Err(SplitError::Validation { ref field, .. }) if field == "lines[0].phone_number"
        ));
    }

    #[test]
    fn test_parse_amount_repairs_strings() {
        assert_eq!(
            parse_amount("x", Some(&json!("$1,234.5"))).unwrap(),
            dec("1234.50")
        );
        assert_eq!(parse_amount("x", Some(&json!(""))).unwrap(), Decimal::ZERO);
        assert_eq!(parse_amount("x", None).unwrap(), Decimal::ZERO);
        assert_eq!(parse_amount("x", Some(&json!(0.1))).unwrap(), dec("0.10"));
        assert!(parse_amount("x", Some(&json!("twelve"))).is_err());
        assert!(parse_amount("x", Some(&json!(true))).is_err());
    }

    #[test]
    fn test_absurd_amounts_are_rejected_before_summing() {
        let d = draft(json!({
            "month": 11, "year": 2024,
            "total_due": "70000000000000000000000000000",
            "plan_total": "70000000000000000000000000000",
            "equipment_total": "70000000000000000000000000000",
            "lines": [{"phone_number": "1234567890", "plan_charge": 10}]
        }));

        let result = std::panic::catch_unwind(|| normalize(&d, &directory()));
        match result {
            Ok(Err(SplitError::Validation { field, .. })) => assert_eq!(field, "total_due"),
            other => panic!("expected a validation error, got {:?}", other),
        }

        assert_eq!(
            parse_amount("x", Some(&json!("1000000000"))).unwrap(),
            MAX_AMOUNT
        );
        assert!(parse_amount("x", Some(&json!("1000000000.01"))).is_err());
    }

    #[test]
    fn test_integral_floats_are_accepted_for_period() {
        let d = draft(json!({
            "month": 11.0, "year": 2024.0, "total_due": 10, "plan_total": 10,
            "lines": [{"phone_number": "1234567890", "plan_charge": 10}]
        }));

        let bill = normalize(&d, &directory()).unwrap().bill;
        assert_eq!((bill.month, bill.year), (11, 2024));

        let fractional = draft(json!({
            "month": 11.5, "year": 2024,
            "lines": [{"phone_number": "1234567890"}]
        }));
        assert!(matches!(
            normalize(&fractional, &directory()),
            Err(SplitError::Validation { ref field, .. }) if field == "month"
        ));
    }
}
