use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::auth::{AccessToken, AuthError, TokenStore};

/// Keeps the access token in a single JSON file (`token.json` by default).
///
/// Writes go to a sibling temp file first and are renamed over the real one,
/// so a crash mid-write never leaves a truncated token behind. Nothing locks
/// the file: two processes sharing it race, and the last writer wins.
pub struct JsonTokenStore {
    path: PathBuf,
}

impl JsonTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "token.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TokenStore for JsonTokenStore {
    async fn load(&self) -> Result<Option<AccessToken>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AuthError::Storage(format!("{}: {}", self.path.display(), e)))?;

        let token: AccessToken = serde_json::from_str(&text)
            .map_err(|e| AuthError::Storage(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(token))
    }

    async fn save(&self, token: &AccessToken) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::Storage(e.to_string()))?;
        }

        let text =
            serde_json::to_string_pretty(token).map_err(|e| AuthError::Storage(e.to_string()))?;

        let tmp = self.temp_path();
        fs::write(&tmp, text)
            .await
            .map_err(|e| AuthError::Storage(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AuthError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}
