pub mod ai_service;
pub mod models;

pub use ai_service::{AiError, AiProvider, PolicyAssistant, DEFAULT_SYSTEM_PROMPT};
pub use models::{AiConfig, AiMessage};
