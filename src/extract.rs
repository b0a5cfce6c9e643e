use crate::error::{Result, SplitError};
use crate::schema::BillDraft;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Extraction {
    pub raw_text: String,
    pub draft: BillDraft,
}

/// Produces a best-effort draft bill from a bill document.
#[allow(async_fn_in_trait)]
pub trait BillExtractor {
    async fn extract(&self, path: &Path) -> Result<Extraction>;
}

/// Removes a surrounding markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(reply: &str) -> &str {
    let mut text = reply.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
        text = text.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// Parses a model reply into a draft. Anything that is not a JSON object
/// is an extraction failure carrying the parser's message.
pub fn parse_model_reply(reply: &str) -> Result<BillDraft> {
    let body = strip_code_fences(reply);
    if body.is_empty() {
        return Err(SplitError::Extraction("model returned an empty reply".into()));
    }
    BillDraft::from_json(body).map_err(|e| {
        SplitError::Extraction(format!("model reply is not a valid bill: {}", e))
    })
}
