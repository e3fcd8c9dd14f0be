/// The only document type the assistant syncs and reads.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A folder on the remote drive, resolved from its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFolderRef {
    pub id: String,
    pub name: String,
}

/// A document listed inside a remote folder. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocumentRef {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_id: String,
}

/// A document the sync engine could not place in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub name: String,
    pub reason: String,
}

/// Outcome of one sync run. Skipped documents do not make the run fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: Vec<String>,
    pub skipped: Vec<SkippedDocument>,
}

impl SyncReport {
    pub fn synced_count(&self) -> usize {
        self.synced.len()
    }
}
