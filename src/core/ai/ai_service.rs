use super::models::{AiConfig, AiMessage};
use async_trait::async_trait;
use std::error::Error;

/// What the user sees when the completion call fails for any reason.
pub const SERVICE_ERROR_MESSAGE: &str = "An error occurred while trying to contact the AI.";

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an intelligent HR Policy Assistant. Your primary goal is to answer employee questions using *only* the content from the provided HR documents.

Your tasks are:
1. **Analyze the User's Question:** Understand the user's intent. Are they asking for a specific detail (e.g., 'how many sick days?') or a general policy summary (e.g., 'tell me about travel')?

2. **Search the Documents:** Carefully search all the provided document text to find relevant information. The user's phrasing might not be an exact match, so look for related topics and keywords.

3. **Formulate the Answer:**
   * If you find a **direct answer** to a specific question, provide it clearly and cite the source document name (e.g., "According to 'Leave Policy.docx', you are entitled to...").
   * If the user asks a **general question** and you find the relevant document, provide a brief summary of that policy's main points. You must still cite the source document.
   * If after a thorough search you genuinely **cannot find any relevant information** in the documents, you MUST respond with the exact phrase: 'I could not find an answer to your question in the provided policy documents.'

4. **Adhere to Boundaries:** Do not make up information or use any knowledge outside of the provided text. Be formal and professional."#;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Configuration error: no completion API key is configured")]
    MissingApiKey,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request and returns the first completion's text.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Answers questions strictly from the supplied policy context.
pub struct PolicyAssistant<P: AiProvider> {
    provider: P,
    system_prompt: String,
    config: AiConfig,
}

impl<P: AiProvider> PolicyAssistant<P> {
    pub fn new(provider: P, system_prompt: String, config: AiConfig) -> Self {
        Self {
            provider,
            system_prompt,
            config,
        }
    }

    /// Builds the message turns for one question.
    pub fn build_messages(&self, question: &str, context: &str) -> Vec<AiMessage> {
        vec![
            AiMessage::system(self.system_prompt.clone()),
            AiMessage::user(format!("Here are the HR policies:\n{}", context)),
            AiMessage::user(format!("Please answer this question: {}", question)),
        ]
    }

    /// Returns the model's answer verbatim, or a generic message if the call fails.
    pub async fn ask(&self, question: &str, context: &str) -> String {
        let messages = self.build_messages(question, context);

        tracing::debug!(model = %self.config.model, "Sending question to AI");
        match self.provider.chat_complete(&messages, &self.config).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("An error occurred with the completion API: {}", e);
                SERVICE_ERROR_MESSAGE.to_string()
            }
        }
    }
}
