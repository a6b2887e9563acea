//! Answer generator trait.
//!
//! A generator takes a fully built prompt and returns raw text-generation
//! output. Output follows text-generation semantics: the prompt followed by
//! the completion, so the answer marker appended by
//! [`build_prompt`](crate::prompt::build_prompt) is present for
//! [`extract_answer`](crate::prompt::extract_answer).

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Offline generator that "answers" with the first context paragraph.
///
/// Returns the prompt followed by the first line of context, which keeps the
/// whole pipeline runnable without a model and gives tests a predictable
/// answer.
///
/// A first context paragraph that itself contains `Answer:` moves the last
/// marker into the echoed text, so extraction returns only what follows that
/// inner marker.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

#[async_trait]
impl AnswerGenerator for EchoGenerator {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let first_context = prompt
            .split_once("Context:\n")
            .and_then(|(_, rest)| rest.split("\n\n").next())
            .unwrap_or("")
            .trim();
        Ok(format!("{} {}", prompt, first_context))
    }
}
