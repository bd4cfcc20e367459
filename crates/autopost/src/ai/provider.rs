//! Language-model provider trait and common types.

use async_trait::async_trait;

use crate::error::AutopostResult;

/// Speaker of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIRole {
    /// Persona and rules
    System,
    User,
    Assistant,
}

/// One prompt message.
#[derive(Debug, Clone)]
pub struct AIMessage {
    pub role: AIRole,
    pub content: String,
}

impl AIMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: AIRole::Assistant,
            content: content.into(),
        }
    }
}

/// Tokens billed for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Raw model output, before cleaning and validation.
#[derive(Debug, Clone)]
pub struct AIResponse {
    pub text: String,
    pub usage: TokenUsage,
    /// Model id echoed by the provider
    pub model: String,
    pub provider: String,
}

/// Sampling knobs; `None` leaves the provider default.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// A language model that turns prompt messages into text.
///
/// Every generation attempt is exactly one `generate_text` call.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether calls reach a real external API.
    fn is_external(&self) -> bool {
        true
    }

    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        options: &GenerateOptions,
    ) -> AutopostResult<AIResponse>;
}
