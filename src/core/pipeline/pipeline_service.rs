// Knowledge-base pipeline: authorize -> resolve folder -> sync -> read cache.
//
// Each step runs to completion before the next starts. Anything that leaves
// the run without a credential or without a located folder aborts it.

use crate::core::auth::{AuthError, AuthorizationFlow, CredentialStore, TokenStore};
use crate::core::corpus::{CorpusReader, PolicyContext, TextExtractor};
use crate::core::drive::{DriveClient, DriveError, DriveService, SyncReport};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Drive(#[from] DriveError),
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub folder_name: String,
    pub cache_dir: PathBuf,
    pub scopes: Vec<String>,
}

/// Result of one full pipeline run.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    pub report: SyncReport,
    pub context: PolicyContext,
}

pub struct KnowledgeBasePipeline<S, F, C, E>
where
    S: TokenStore,
    F: AuthorizationFlow,
    C: DriveClient,
    E: TextExtractor,
{
    credentials: CredentialStore<S, F>,
    drive: DriveService<C>,
    corpus: CorpusReader<E>,
    settings: PipelineSettings,
}

impl<S, F, C, E> KnowledgeBasePipeline<S, F, C, E>
where
    S: TokenStore,
    F: AuthorizationFlow,
    C: DriveClient,
    E: TextExtractor,
{
    pub fn new(
        credentials: CredentialStore<S, F>,
        drive: DriveService<C>,
        corpus: CorpusReader<E>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            credentials,
            drive,
            corpus,
            settings,
        }
    }

    pub async fn build(&mut self) -> Result<KnowledgeBase, PipelineError> {
        tracing::info!("Attempting to connect to Google Drive...");
        let token = self.credentials.obtain_token(&self.settings.scopes).await?;

        let folder = self
            .drive
            .resolve_folder(&self.settings.folder_name, token)
            .await?;

        let report = self
            .drive
            .sync_folder(&folder, token, &self.settings.cache_dir)
            .await?;

        let context = self.corpus.read_corpus(&self.settings.cache_dir).await;
        tracing::debug!("Text being sent to the AI:\n{}", context.render());

        Ok(KnowledgeBase { report, context })
    }
}
