// Local corpus reader - turns the cache directory into the policy context blob.
//
// The blob is rebuilt from scratch on every call. Files are read in file-name
// order so the same cache always yields the same blob.

use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Extension of cache files the reader picks up.
pub const DOCUMENT_EXTENSION: &str = ".docx";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid document archive: {0}")]
    Archive(String),

    #[error("Invalid document XML: {0}")]
    Xml(String),
}

/// Turns raw document bytes into paragraph-level text blocks.
pub trait TextExtractor: Send + Sync {
    fn extract_paragraphs(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
}

/// One cached document and its extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub name: String,
    pub paragraphs: Vec<String>,
}

/// Ordered set of documents handed to the answer service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyContext {
    pub documents: Vec<PolicyDocument>,
}

impl PolicyContext {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Renders the marker-delimited blob sent to the model.
    pub fn render(&self) -> String {
        let mut blob = String::new();
        for doc in &self.documents {
            blob.push_str(&format!("--- Start of Document: {} ---\n", doc.name));
            blob.push_str(&doc.paragraphs.join("\n"));
            blob.push_str(&format!("\n--- End of Document: {} ---\n\n", doc.name));
        }
        blob
    }
}

pub struct CorpusReader<E: TextExtractor> {
    extractor: E,
}

impl<E: TextExtractor> CorpusReader<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }

    /// Reads every cached document. A missing directory is an empty corpus.
    pub async fn read_corpus(&self, cache_dir: &Path) -> PolicyContext {
        tracing::info!("Reading policy documents from cache...");

        let mut names = match list_documents(cache_dir).await {
            Ok(names) => names,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::error!("Could not list {}: {}", cache_dir.display(), e);
                Vec::new()
            }
        };
        names.sort();

        let mut context = PolicyContext::default();
        for name in names {
            let path = cache_dir.join(&name);
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Could not read file {}: {}", name, e);
                    continue;
                }
            };

            match self.extractor.extract_paragraphs(&bytes) {
                Ok(paragraphs) => context.documents.push(PolicyDocument { name, paragraphs }),
                Err(e) => tracing::warn!("Could not read file {}: {}", name, e),
            }
        }

        if context.is_empty() {
            tracing::warn!("Could not find any text in the policy documents.");
        } else {
            tracing::info!(
                documents = context.documents.len(),
                "Successfully loaded all policy text."
            );
        }

        context
    }
}

async fn list_documents(cache_dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = fs::read_dir(cache_dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(DOCUMENT_EXTENSION) {
            names.push(name);
        }
    }

    Ok(names)
}
