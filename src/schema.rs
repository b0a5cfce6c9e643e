//! Loose shape of a bill as returned by the extraction model.
//!
//! Every field is an optional raw JSON value so that whatever the model
//! produced survives deserialization and reaches the normalizer, which is
//! the only place allowed to decide what is acceptable.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BillDraft {
    #[schemars(
        with = "Option<String>",
        description = "Billing month taken from the bill issue date, as a number 1-12"
    )]
    pub month: Option<Value>,

    #[schemars(
        with = "Option<String>",
        description = "4-digit year taken from the bill issue date"
    )]
    pub year: Option<Value>,

    #[schemars(with = "Option<f64>", description = "Total amount due for this bill")]
    pub total_due: Option<Value>,

    #[serde(alias = "plan")]
    #[schemars(
        with = "Option<f64>",
        description = "Total plan charges across all lines"
    )]
    pub plan_total: Option<Value>,

    #[serde(alias = "equipment")]
    #[schemars(
        with = "Option<f64>",
        description = "Total equipment (device installment) charges"
    )]
    pub equipment_total: Option<Value>,

    #[serde(alias = "one_time_charges")]
    #[schemars(
        with = "Option<f64>",
        description = "Total one-time charges from the bill summary section"
    )]
    pub one_time_total: Option<Value>,

    #[serde(alias = "line_charges")]
    #[schemars(
        with = "Option<Vec<LineDraft>>",
        description = "One entry per phone line on the bill"
    )]
    pub lines: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LineDraft {
    #[serde(alias = "phone")]
    #[schemars(with = "Option<String>", description = "Phone number, e.g. 123-456-7890")]
    pub phone_number: Option<Value>,

    #[schemars(with = "Option<String>")]
    pub owner: Option<Value>,

    #[serde(alias = "line_amount")]
    #[schemars(
        with = "Option<f64>",
        description = "This line's equal portion of the plan total"
    )]
    pub plan_charge: Option<Value>,

    #[serde(alias = "equipment_amount", alias = "equipement_amount")]
    #[schemars(with = "Option<f64>")]
    pub equipment_charge: Option<Value>,

    #[serde(alias = "one_time_amount")]
    #[schemars(with = "Option<f64>")]
    pub one_time_charge: Option<Value>,
}

impl BillDraft {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Pretty-printed JSON Schema describing the expected model output.
    pub fn json_schema() -> String {
        let schema = schema_for!(BillDraft);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_legacy_field_names() {
        let draft = BillDraft::from_json(
            r#"{
                "month": "11", "year": "2024", "total_due": 245.67,
                "plan": 185.0, "equipment": 51.88, "one_time_charges": 3.5,
                "line_charges": [
                    {"phone": "123-456-7890", "owner": "Alice", "line_amount": 46.25,
                     "equipement_amount": 18.96, "one_time_amount": 0}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(draft.plan_total, Some(json!(185.0)));
        assert_eq!(draft.one_time_total, Some(json!(3.5)));

        let lines = draft.lines.unwrap();
        let line: LineDraft = serde_json::from_value(lines[0].clone()).unwrap();
        assert_eq!(line.phone_number, Some(json!("123-456-7890")));
        assert_eq!(line.equipment_charge, Some(json!(18.96)));
    }

    #[test]
    fn test_missing_fields_deserialize_as_none() {
        let draft = BillDraft::from_json(r#"{"month": 3}"#).unwrap();
        assert!(draft.year.is_none());
        assert!(draft.lines.is_none());
    }

    #[test]
    fn test_schema_lists_line_fields() {
        let schema = BillDraft::json_schema();
        assert!(schema.contains("total_due"));
        assert!(schema.contains("equipment_charge"));
    }
}
