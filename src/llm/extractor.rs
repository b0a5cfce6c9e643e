use crate::directory::OwnerDirectory;
use crate::error::Result;
use crate::extract::{parse_model_reply, BillExtractor, Extraction};
use crate::llm::client::ChatClient;
use crate::llm::prompts;
use crate::pdf;
use log::{debug, info};
use std::path::Path;

/// Reads the bill PDF as text and asks a chat model to structure it.
pub struct LlmBillExtractor {
    client: ChatClient,
    model: String,
    system_prompt: String,
    directory: OwnerDirectory,
    max_pages: u32,
}

impl LlmBillExtractor {
    pub fn new(client: ChatClient, model: impl Into<String>, directory: OwnerDirectory) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: prompts::system_prompt(),
            directory,
            max_pages: pdf::DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

impl BillExtractor for LlmBillExtractor {
    async fn extract(&self, path: &Path) -> Result<Extraction> {
        let raw_text = pdf::extract_text(path, self.max_pages).await?;
        info!("Extracted {} characters of bill text", raw_text.chars().count());

        let prompt = prompts::bill_prompt(&raw_text, &self.directory);
        let reply = self
            .client
            .complete(&self.model, &self.system_prompt, &prompt)
            .await?;
        debug!("Model reply: {}", reply);

        let draft = parse_model_reply(&reply)?;
        Ok(Extraction { raw_text, draft })
    }
}
