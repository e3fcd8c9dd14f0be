// Runtime configuration, read from environment variables (a `.env` file is
// loaded first by `main`). Only the completion API key is mandatory.

use crate::core::ai::DEFAULT_SYSTEM_PROMPT;
use crate::infra::ai::{is_usable_api_key, DEFAULT_BASE_URL};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Configuration error: OPENAI_API_KEY is not set. Add your API key to the environment or a .env file."
    )]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub folder_name: String,
    pub cache_dir: PathBuf,
    pub client_secret_file: PathBuf,
    pub token_file: PathBuf,
    pub system_prompt_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY")
            .filter(|k| is_usable_api_key(k))
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            folder_name: get("POLICY_FOLDER_NAME").unwrap_or_else(|| "HR Policies".to_string()),
            cache_dir: get("POLICY_CACHE_DIR")
                .unwrap_or_else(|| "policies_cache".to_string())
                .into(),
            client_secret_file: get("GOOGLE_CLIENT_SECRET_FILE")
                .unwrap_or_else(|| "credentials.json".to_string())
                .into(),
            token_file: get("GOOGLE_TOKEN_FILE")
                .unwrap_or_else(|| "token.json".to_string())
                .into(),
            system_prompt_file: get("ASSISTANT_SYSTEM_PROMPT_FILE").map(PathBuf::from),
        })
    }

    /// The system instruction, read from `system_prompt_file` when one is configured.
    pub fn system_prompt(&self) -> String {
        match &self.system_prompt_file {
            Some(path) => std::fs::read_to_string(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to read system prompt file at {}: {}", path.display(), e);
                DEFAULT_SYSTEM_PROMPT.to_string()
            }),
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.openai_model, "gpt-3.5-turbo");
        assert_eq!(config.openai_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.folder_name, "HR Policies");
        assert_eq!(config.cache_dir, PathBuf::from("policies_cache"));
        assert_eq!(config.client_secret_file, PathBuf::from("credentials.json"));
        assert_eq!(config.token_file, PathBuf::from("token.json"));
        assert!(config.system_prompt_file.is_none());
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("POLICY_FOLDER_NAME", "People Ops"),
            ("POLICY_CACHE_DIR", "/tmp/cache"),
            ("GOOGLE_TOKEN_FILE", ""),
        ]))
        .unwrap();

        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.folder_name, "People Ops");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(config.token_file, PathBuf::from("token.json"));
    }

    #[test]
    fn test_missing_or_placeholder_key_is_error() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[])),
            Err(ConfigError::MissingApiKey)
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "YOUR_OPENAI_API_KEY_HERE")])),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_system_prompt_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "Answer in French.").unwrap();

        let mut config = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        config.system_prompt_file = Some(path);
        assert_eq!(config.system_prompt(), "Answer in French.");

        config.system_prompt_file = Some(dir.path().join("missing.txt"));
        assert_eq!(config.system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }
}
