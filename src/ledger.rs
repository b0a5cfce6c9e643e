use crate::config::Config;
use crate::duplicate::ExpenseRecord;
use crate::error::{Result, SplitError};
use crate::model::Allocation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerUser {
    pub id: u64,
    pub first_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub user_id: u64,
    pub owner: String,
    pub paid_share: Decimal,
    pub owed_share: Decimal,
}

/// An expense ready to be posted: one payer of record, one split per ledger user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub group_id: u64,
    pub cost: Decimal,
    pub description: String,
    pub details: String,
    pub payer_id: u64,
    pub splits: Vec<ExpenseSplit>,
}

impl NewExpense {
    pub fn from_allocation(
        config: &Config,
        description: impl Into<String>,
        details: impl Into<String>,
        allocation: &Allocation,
    ) -> Result<Self> {
        let payer_id = config.payer_id().ok_or_else(|| {
            SplitError::Config(format!(
                "payer '{}' is not in user_mappings",
                config.payer_name
            ))
        })?;
        let cost = allocation.total();

        // Several owner names may map to one ledger user; that user gets a
        // single split carrying the sum of their shares.
        let mut splits: Vec<ExpenseSplit> = Vec::with_capacity(allocation.shares.len() + 1);
        for share in &allocation.shares {
            let user_id = config.user_mappings.get(&share.owner).copied().ok_or_else(|| {
                SplitError::Config(format!(
                    "owner '{}' has no ledger user in user_mappings",
                    share.owner
                ))
            })?;
            match splits.iter_mut().find(|s| s.user_id == user_id) {
                Some(split) => {
                    split.owed_share += share.subtotal;
                    split.owner = format!("{}, {}", split.owner, share.owner);
                }
                None => splits.push(ExpenseSplit {
                    user_id,
                    owner: share.owner.clone(),
                    paid_share: if user_id == payer_id { cost } else { Decimal::ZERO },
                    owed_share: share.subtotal,
                }),
            }
        }

        if !splits.iter().any(|s| s.user_id == payer_id) {
            splits.push(ExpenseSplit {
                user_id: payer_id,
                owner: config.payer_name.clone(),
                paid_share: cost,
                owed_share: Decimal::ZERO,
            });
        }

        Ok(Self {
            group_id: config.group_id,
            cost,
            description: description.into(),
            details: details.into(),
            payer_id,
            splits,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedExpense {
    pub id: u64,
    pub description: String,
    pub cost: Decimal,
}

/// The shared-expense ledger. Calls block until they finish; retries are
/// left to the implementation.
#[allow(async_fn_in_trait)]
pub trait Ledger {
    async fn current_user(&self) -> Result<LedgerUser>;

    /// Expenses in the group, most recent first.
    async fn list_expenses(&self, group_id: u64) -> Result<Vec<ExpenseRecord>>;

    async fn create_expense(&self, expense: &NewExpense) -> Result<CreatedExpense>;

    async fn add_comment(&self, expense_id: u64, content: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OwnerShare;
    use std::collections::BTreeMap;

    fn config() -> Config {
        Config {
            group_id: 42,
            group_name: "Family".to_string(),
            payer_name: "Alice".to_string(),
            user_mappings: BTreeMap::from([("Alice".to_string(), 1), ("Bob".to_string(), 2)]),
            description_template: "T-Mobile Bill - {month}/{year}".to_string(),
        }
    }

    fn share(owner: &str, subtotal: Decimal) -> OwnerShare {
        OwnerShare {
            owner: owner.to_string(),
            line_charges: subtotal,
            equipment: Decimal::ZERO,
            one_time: Decimal::ZERO,
            shared: Decimal::ZERO,
            subtotal,
        }
    }

    fn allocation(shares: Vec<OwnerShare>) -> Allocation {
        Allocation {
            remainder_owner: shares[0].owner.clone(),
            shares,
            residual: Decimal::ZERO,
            remainder: Decimal::ZERO,
        }
    }

    #[test]
    fn test_payer_pays_whole_cost() {
        let alloc = allocation(vec![
            share("Alice", Decimal::new(6000, 2)),
            share("Bob", Decimal::new(4000, 2)),
        ]);
        let expense = NewExpense::from_allocation(&config(), "T-Mobile Bill - 1/2025", "", &alloc)
            .unwrap();

        assert_eq!(expense.cost, Decimal::new(10000, 2));
        assert_eq!(expense.payer_id, 1);
        assert_eq!(expense.splits.len(), 2);
        assert_eq!(expense.splits[0].paid_share, expense.cost);
        assert_eq!(expense.splits[0].owed_share, Decimal::new(6000, 2));
        assert_eq!(expense.splits[1].paid_share, Decimal::ZERO);
        assert_eq!(expense.splits[1].owed_share, Decimal::new(4000, 2));
    }

    #[test]
    fn test_payer_without_share_still_pays() {
        let alloc = allocation(vec![share("Bob", Decimal::new(4000, 2))]);
        let expense = NewExpense::from_allocation(&config(), "d", "", &alloc).unwrap();

        assert_eq!(expense.splits.len(), 2);
        let payer = expense.splits.iter().find(|s| s.user_id == 1).unwrap();
        assert_eq!(payer.paid_share, Decimal::new(4000, 2));
        assert_eq!(payer.owed_share, Decimal::ZERO);
    }

    #[test]
    fn test_owners_sharing_a_ledger_user_are_merged() {
        let mut config = config();
        config.user_mappings.insert("Alice Work".to_string(), 1);
        let alloc = allocation(vec![
            share("Alice", Decimal::new(3000, 2)),
            share("Alice Work", Decimal::new(3000, 2)),
            share("Bob", Decimal::new(3000, 2)),
        ]);
        let expense = NewExpense::from_allocation(&config, "d", "", &alloc).unwrap();

        assert_eq!(expense.cost, Decimal::new(9000, 2));
        assert_eq!(expense.splits.len(), 2);

        let alice = &expense.splits[0];
        assert_eq!(alice.user_id, 1);
        assert_eq!(alice.owner, "Alice, Alice Work");
        assert_eq!(alice.owed_share, Decimal::new(6000, 2));

        let paid: Decimal = expense.splits.iter().map(|s| s.paid_share).sum();
        let owed: Decimal = expense.splits.iter().map(|s| s.owed_share).sum();
        assert_eq!(paid, expense.cost);
        assert_eq!(owed, expense.cost);
    }

    #[test]
    fn test_unmapped_owner_is_config_error() {
        let alloc = allocation(vec![share("Carol", Decimal::ONE)]);
        assert!(matches!(
            NewExpense::from_allocation(&config(), "d", "", &alloc),
            Err(SplitError::Config(_))
        ));
    }
}
