//! Decides whether a bill period was already posted to the ledger.
//!
//! The ledger can only be searched by description text, so this is a
//! description match, not a key lookup.

use crate::model::BillPeriod;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Text every bill expense description carries.
pub const DUPLICATE_MARKER: &str = "T-Mobile Bill";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: u64,
    pub description: String,
    pub group_id: u64,
    pub cost: Decimal,
}

pub fn is_match(record: &ExpenseRecord, group_id: u64, period: BillPeriod) -> bool {
    record.group_id == group_id
        && record.description.contains(DUPLICATE_MARKER)
        && mentions_period(&record.description, period)
}

/// True when the text contains the month and the year as separate digit
/// runs, whatever separators or zero padding surround them.
pub fn mentions_period(text: &str, period: BillPeriod) -> bool {
    let runs: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .collect();

    let year = period.year.to_string();
    let has_year = runs.iter().any(|run| *run == year);
    let has_month = runs
        .iter()
        .any(|run| run.len() <= 2 && run.parse::<u32>().ok() == Some(period.month));

    has_year && has_month
}

/// Linear scan that stops at the first matching record.
pub fn find_duplicate<I>(group_id: u64, period: BillPeriod, records: I) -> Option<ExpenseRecord>
where
    I: IntoIterator<Item = ExpenseRecord>,
{
    let found = records
        .into_iter()
        .find(|record| is_match(record, group_id, period));

    match &found {
        Some(record) => debug!(
            "Expense {} '{}' already covers {}",
            record.id, record.description, period
        ),
        None => debug!("No expense in group {} covers {}", group_id, period),
    }

    found
}
