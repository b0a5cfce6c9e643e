//! [`Ledger`] backed by the Splitwise v3 REST API.

use crate::duplicate::ExpenseRecord;
use crate::error::{Result, SplitError};
use crate::ledger::{CreatedExpense, Ledger, LedgerUser, NewExpense};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::str::FromStr;

const EXPENSE_PAGE_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct SplitwiseClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CurrentUserResponse {
    user: ApiUser,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: u64,
    #[serde(default)]
    first_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExpensesResponse {
    #[serde(default)]
    expenses: Vec<ApiExpense>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiExpense {
    id: u64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    group_id: Option<u64>,
    #[serde(default)]
    cost: Option<String>,
    #[serde(default)]
    deleted_at: Option<String>,
}

impl ApiExpense {
    fn into_record(self) -> ExpenseRecord {
        ExpenseRecord {
            id: self.id,
            description: self.description.unwrap_or_default(),
            group_id: self.group_id.unwrap_or_default(),
            cost: self
                .cost
                .as_deref()
                .and_then(|c| Decimal::from_str(c).ok())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    #[serde(default)]
    comment: Option<Value>,
    #[serde(default)]
    errors: Option<Value>,
}

/// Splitwise reports failures as `{"errors": {...}}` or `{"errors": [...]}`
/// alongside a 200 status.
fn has_errors(errors: &Option<Value>) -> bool {
    match errors {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Flattens an expense into the `users__{i}__*` form Splitwise expects.
pub fn expense_payload(expense: &NewExpense) -> Value {
    let mut body = Map::new();
    body.insert("cost".into(), json!(format!("{:.2}", expense.cost)));
    body.insert("description".into(), json!(expense.description));
    body.insert("details".into(), json!(expense.details));
    body.insert("group_id".into(), json!(expense.group_id));
    body.insert("currency_code".into(), json!("USD"));

    for (i, split) in expense.splits.iter().enumerate() {
        body.insert(format!("users__{}__user_id", i), json!(split.user_id));
        body.insert(
            format!("users__{}__paid_share", i),
            json!(format!("{:.2}", split.paid_share)),
        );
        body.insert(
            format!("users__{}__owed_share", i),
            json!(format!("{:.2}", split.owed_share)),
        );
    }

    Value::Object(body)
}

impl SplitwiseClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let res = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SplitError::Ledger(format!("{} request failed: {}", what, e)))?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(SplitError::Ledger(format!(
                "{} failed (status {}): {}",
                what, status, err_text
            )));
        }

        res.json()
            .await
            .map_err(|e| SplitError::Ledger(format!("{} returned unreadable body: {}", what, e)))
    }
}

impl Ledger for SplitwiseClient {
    async fn current_user(&self) -> Result<LedgerUser> {
        let body: CurrentUserResponse = self
            .send(self.client.get(self.url("get_current_user")), "get_current_user")
            .await?;
        Ok(LedgerUser {
            id: body.user.id,
            first_name: body.user.first_name.unwrap_or_default(),
        })
    }

    async fn list_expenses(&self, group_id: u64) -> Result<Vec<ExpenseRecord>> {
        let request = self.client.get(self.url("get_expenses")).query(&[
            ("group_id", group_id.to_string()),
            ("limit", EXPENSE_PAGE_LIMIT.to_string()),
        ]);
        let body: ExpensesResponse = self.send(request, "get_expenses").await?;

        Ok(body
            .expenses
            .into_iter()
            .filter(|e| e.deleted_at.is_none())
            .map(ApiExpense::into_record)
            .collect())
    }

    async fn create_expense(&self, expense: &NewExpense) -> Result<CreatedExpense> {
        let request = self
            .client
            .post(self.url("create_expense"))
            .json(&expense_payload(expense));
        let body: ExpensesResponse = self.send(request, "create_expense").await?;

        if has_errors(&body.errors) {
            return Err(SplitError::Ledger(format!(
                "create_expense rejected: {}",
                body.errors.unwrap_or_default()
            )));
        }

        let created = body
            .expenses
            .into_iter()
            .next()
            .ok_or_else(|| SplitError::Ledger("create_expense returned no expense".to_string()))?
            .into_record();

        Ok(CreatedExpense {
            id: created.id,
            description: created.description,
            cost: created.cost,
        })
    }

    async fn add_comment(&self, expense_id: u64, content: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url("create_comment"))
            .json(&json!({ "expense_id": expense_id, "content": content }));
        let body: CommentResponse = self.send(request, "create_comment").await?;

        if has_errors(&body.errors) || body.comment.is_none() {
            return Err(SplitError::Ledger(format!(
                "create_comment rejected for expense {}: {}",
                expense_id,
                body.errors.unwrap_or_default()
            )));
        }
        Ok(())
    }
}
