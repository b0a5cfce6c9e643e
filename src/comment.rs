use crate::model::{Allocation, Bill, NormalizationWarning};

/// Renders the itemized breakdown attached to a posted expense.
pub fn format_breakdown(
    bill: &Bill,
    allocation: &Allocation,
    warnings: &[NormalizationWarning],
) -> String {
    let mut out = String::new();

    out.push_str(&format!("T-Mobile bill breakdown for {}\n", bill.period()));
    out.push_str(&format!("Total due: ${:.2}\n", bill.total_due));
    out.push_str(&format!(
        "Plan ${:.2} | Equipment ${:.2} | One-time ${:.2}\n\n",
        bill.plan_total, bill.equipment_total, bill.one_time_total
    ));

    for share in &allocation.shares {
        out.push_str(&format!("{}: ${:.2}\n", share.owner, share.subtotal));

        for line in bill.lines.iter().filter(|l| l.owner == share.owner) {
            out.push_str(&format!(
                "  {}  plan ${:.2}  equipment ${:.2}  one-time ${:.2}\n",
                format_phone(&line.phone_number),
                line.plan_charge,
                line.equipment_charge,
                line.one_time_charge
            ));
        }

        out.push_str(&format!("  shared ${:.2}\n", share.shared));
    }

    out.push_str(&format!(
        "\nShared charges (taxes, fees, discounts): ${:.2}\n",
        allocation.residual
    ));
    if !allocation.remainder.is_zero() {
        out.push_str(&format!(
            "Rounding adjustment ${:.2} applied to {}\n",
            allocation.remainder, allocation.remainder_owner
        ));
    }
    out.push_str(&format!("Total: ${:.2}", allocation.total()));

    if !warnings.is_empty() {
        out.push_str("\n\nWarnings:");
        for warning in warnings {
            out.push_str(&format!("\n  - {}", warning));
        }
    }

    out
}

/// `1234567890` → `123-456-7890`; anything else is shown as-is.
pub fn format_phone(digits: &str) -> String {
    if digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        digits.to_string()
    }
}
