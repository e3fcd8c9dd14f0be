// Folder resolution and document sync.
//
// Contract of a sync run:
// - listing errors abort the run
// - an empty listing is a successful run with nothing synced
// - a failure on one document is logged and skipped; the rest still sync
// - existing cache entries with the same name are overwritten (last write wins)
// - a cache entry only ever holds a complete download: bytes land in a
//   partial file first and are renamed into place
//
// Known gap: if the remote side masks a listing failure as an empty result,
// the run reports success with zero files. There is no way to tell the two
// apart from the listing alone.

use super::drive_models::{
    RemoteDocumentRef, RemoteFolderRef, SkippedDocument, SyncReport, DOCX_MIME_TYPE,
};
use crate::core::auth::AccessToken;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("The folder '{0}' was not found in your Google Drive")]
    FolderNotFound(String),

    #[error("Google Drive API error: {0}")]
    Remote(String),

    #[error("Cache I/O error: {0}")]
    Io(String),
}

// ============================================================================
// PORT
// ============================================================================

/// Remote file-storage operations the sync engine needs.
#[async_trait]
pub trait DriveClient: Send + Sync {
    /// Non-trashed folders whose name equals `name`, in the order the remote returns them.
    async fn find_folders(
        &self,
        name: &str,
        token: &AccessToken,
    ) -> Result<Vec<RemoteFolderRef>, DriveError>;

    /// Non-trashed documents of `mime_type` directly inside `folder`.
    async fn list_documents(
        &self,
        folder: &RemoteFolderRef,
        mime_type: &str,
        token: &AccessToken,
    ) -> Result<Vec<RemoteDocumentRef>, DriveError>;

    /// Full byte content of a document.
    async fn download(
        &self,
        document: &RemoteDocumentRef,
        token: &AccessToken,
    ) -> Result<Vec<u8>, DriveError>;
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct DriveService<C: DriveClient> {
    client: C,
    mime_type: String,
}

impl<C: DriveClient> DriveService<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            mime_type: DOCX_MIME_TYPE.to_string(),
        }
    }

    /// Resolves a folder by display name. Ambiguous names resolve to the first match.
    pub async fn resolve_folder(
        &self,
        name: &str,
        token: &AccessToken,
    ) -> Result<RemoteFolderRef, DriveError> {
        let folders = self.client.find_folders(name, token).await?;

        if folders.len() > 1 {
            tracing::warn!(
                "{} folders are named '{}', using the first one ({})",
                folders.len(),
                name,
                folders[0].id
            );
        }

        let folder = folders
            .into_iter()
            .next()
            .ok_or_else(|| DriveError::FolderNotFound(name.to_string()))?;

        tracing::info!("Successfully found folder '{}'.", folder.name);
        Ok(folder)
    }

    /// Downloads every eligible document in `folder` into `dest_dir`.
    pub async fn sync_folder(
        &self,
        folder: &RemoteFolderRef,
        token: &AccessToken,
        dest_dir: &Path,
    ) -> Result<SyncReport, DriveError> {
        fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| DriveError::Io(format!("{}: {}", dest_dir.display(), e)))?;

        tracing::info!("Syncing policy documents...");
        let documents = self
            .client
            .list_documents(folder, &self.mime_type, token)
            .await?;

        let mut report = SyncReport::default();

        if documents.is_empty() {
            tracing::info!("No .docx policy files found in the folder.");
            return Ok(report);
        }

        for document in &documents {
            match self.sync_document(document, token, dest_dir).await {
                Ok(()) => {
                    tracing::info!(" - Synced '{}'", document.name);
                    report.synced.push(document.name.clone());
                }
                Err(e) => {
                    tracing::warn!("Skipping '{}': {}", document.name, e);
                    report.skipped.push(SkippedDocument {
                        name: document.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            synced = report.synced.len(),
            skipped = report.skipped.len(),
            "Document sync complete."
        );
        Ok(report)
    }

    async fn sync_document(
        &self,
        document: &RemoteDocumentRef,
        token: &AccessToken,
        dest_dir: &Path,
    ) -> Result<(), DriveError> {
        let (final_path, partial_path) = cache_paths(dest_dir, document)?;
        tracing::debug!(
            id = %document.id,
            parent = %document.parent_id,
            mime_type = %document.mime_type,
            "Downloading '{}'",
            document.name
        );
        let bytes = self.client.download(document, token).await?;
        write_atomically(&final_path, &partial_path, &bytes).await
    }
}

/// Longest slice of the document id that goes into a partial file name.
const MAX_PARTIAL_ID_LEN: usize = 64;

/// Final and partial cache paths for a document.
///
/// The display name is used verbatim for the final file, so anything that is
/// not a single plain path component is rejected rather than written outside
/// the cache directory. The partial file is named after the document id, so
/// any name that fits the filesystem also fits while it downloads.
fn cache_paths(
    dest_dir: &Path,
    document: &RemoteDocumentRef,
) -> Result<(PathBuf, PathBuf), DriveError> {
    let name = document.name.as_str();
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(DriveError::Io(format!(
            "document name '{}' is not a valid file name",
            name
        )));
    }

    Ok((
        dest_dir.join(name),
        dest_dir.join(partial_file_name(&document.id)),
    ))
}

/// `.partial-<id>`, keeping only id characters that are safe in a file name.
fn partial_file_name(id: &str) -> String {
    let safe_id: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_PARTIAL_ID_LEN)
        .collect();
    format!(".partial-{}", safe_id)
}

async fn write_atomically(
    final_path: &Path,
    partial_path: &Path,
    bytes: &[u8],
) -> Result<(), DriveError> {
    if let Err(e) = fs::write(partial_path, bytes).await {
        let _ = fs::remove_file(partial_path).await;
        return Err(DriveError::Io(format!("{}: {}", partial_path.display(), e)));
    }

    if let Err(e) = fs::rename(partial_path, final_path).await {
        let _ = fs::remove_file(partial_path).await;
        return Err(DriveError::Io(format!("{}: {}", final_path.display(), e)));
    }

    Ok(())
}
