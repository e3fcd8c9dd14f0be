use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::core::auth::AccessToken;
use crate::core::drive::{DriveClient, DriveError, RemoteDocumentRef, RemoteFolderRef};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,parents)";
const PAGE_SIZE: &str = "100";

/// Minimal Google Drive v3 REST client. It only exposes the calls the sync engine needs.
pub struct GoogleDriveClient {
    client: Client,
    base_url: String,
}

impl GoogleDriveClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Runs a `files.list` query, following `nextPageToken` until exhausted.
    async fn list_files(&self, query: &str, token: &AccessToken) -> Result<Vec<ApiFile>, DriveError> {
        let url = format!("{}/files", self.base_url);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query),
                ("spaces", "drive"),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(page) = page_token.as_deref() {
                params.push(("pageToken", page));
            }

            let resp = self
                .client
                .get(&url)
                .header("Authorization", token.bearer())
                .query(&params)
                .send()
                .await
                .map_err(|e| DriveError::Remote(e.to_string()))?;

            let resp = check_status(resp).await?;
            let page: ApiFileList = resp
                .json()
                .await
                .map_err(|e| DriveError::Remote(e.to_string()))?;

            files.extend(page.files);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }
}

impl Default for GoogleDriveClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriveClient for GoogleDriveClient {
    async fn find_folders(
        &self,
        name: &str,
        token: &AccessToken,
    ) -> Result<Vec<RemoteFolderRef>, DriveError> {
        let files = self.list_files(&folder_query(name), token).await?;

        Ok(files
            .into_iter()
            .map(|f| RemoteFolderRef {
                id: f.id,
                name: f.name,
            })
            .collect())
    }

    async fn list_documents(
        &self,
        folder: &RemoteFolderRef,
        mime_type: &str,
        token: &AccessToken,
    ) -> Result<Vec<RemoteDocumentRef>, DriveError> {
        let files = self
            .list_files(&documents_query(&folder.id, mime_type), token)
            .await?;

        Ok(files
            .into_iter()
            .map(|f| RemoteDocumentRef {
                id: f.id,
                name: f.name,
                mime_type: f.mime_type.unwrap_or_else(|| mime_type.to_string()),
                parent_id: folder.id.clone(),
            })
            .collect())
    }

    async fn download(
        &self,
        document: &RemoteDocumentRef,
        token: &AccessToken,
    ) -> Result<Vec<u8>, DriveError> {
        let url = format!("{}/files/{}", self.base_url, document.id);

        let resp = self
            .client
            .get(&url)
            .header("Authorization", token.bearer())
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| DriveError::Remote(e.to_string()))?;

        let mut resp = check_status(resp).await?;

        let mut bytes = Vec::with_capacity(resp.content_length().unwrap_or(0) as usize);
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| DriveError::Remote(format!("download of '{}' interrupted: {}", document.name, e)))?
        {
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(bytes = bytes.len(), "Downloaded '{}'", document.name);
        Ok(bytes)
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, DriveError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_default();
    let hint = match status {
        StatusCode::UNAUTHORIZED => " (access token rejected)",
        StatusCode::FORBIDDEN => " (missing permission or rate limit hit)",
        _ => "",
    };
    Err(DriveError::Remote(format!("{}{}: {}", status, hint, text)))
}

/// Escapes a literal for use inside a single-quoted Drive query string.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn folder_query(name: &str) -> String {
    format!(
        "name='{}' and mimeType='{}' and trashed=false",
        escape_query_value(name),
        FOLDER_MIME_TYPE
    )
}

fn documents_query(folder_id: &str, mime_type: &str) -> String {
    format!(
        "'{}' in parents and mimeType='{}' and trashed=false",
        escape_query_value(folder_id),
        escape_query_value(mime_type)
    )
}

// ============================================================================
// API response structures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFileList {
    #[serde(default)]
    files: Vec<ApiFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: String,
    name: String,
    mime_type: Option<String>,
}
