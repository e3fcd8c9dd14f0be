// This is the entry point of the HR policy assistant.
//
// **Architecture Overview:**
// - `core/` = Business logic (credential lifecycle, sync, corpus, answering)
// - `infra/` = Implementations of core traits (Google OAuth, Drive, DOCX, OpenAI)
// - `shell/` = The interactive terminal loop
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Build the knowledge base (authorize, sync, read cache)
// 4. Hand over to the question loop
//
// Everything runs sequentially on one task. The cache directory and the token
// file are not locked, so two instances pointed at the same paths will race.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "shell/shell_layer.rs"]
mod shell;

mod config;

use crate::config::AppConfig;
use crate::core::ai::{AiConfig, PolicyAssistant};
use crate::core::auth::{CredentialStore, DRIVE_READONLY_SCOPE};
use crate::core::corpus::CorpusReader;
use crate::core::drive::DriveService;
use crate::core::pipeline::{KnowledgeBasePipeline, PipelineSettings};
use crate::infra::ai::OpenAiClient;
use crate::infra::auth::{GoogleOAuthFlow, JsonTokenStore};
use crate::infra::docx::DocxExtractor;
use crate::infra::drive::GoogleDriveClient;
use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Logs go to stderr so they don't interleave with answers on stdout.
    // RUST_LOG=debug also dumps the policy text sent to the model.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    println!("--- HR Policy Assistant ---");

    // Missing API key is fatal before any remote call is made.
    let config = AppConfig::from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let ai_client = OpenAiClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
    )?;
    let ai_config = AiConfig {
        model: config.openai_model.clone(),
    };
    let assistant = PolicyAssistant::new(ai_client, config.system_prompt(), ai_config);

    let credentials = CredentialStore::new(
        JsonTokenStore::new(&config.token_file),
        GoogleOAuthFlow::new(&config.client_secret_file),
    );
    let mut pipeline = KnowledgeBasePipeline::new(
        credentials,
        DriveService::new(GoogleDriveClient::new()),
        CorpusReader::new(DocxExtractor),
        PipelineSettings {
            folder_name: config.folder_name.clone(),
            cache_dir: config.cache_dir.clone(),
            scopes: vec![DRIVE_READONLY_SCOPE.to_string()],
        },
    );

    // ========================================================================
    // KNOWLEDGE BASE
    // ========================================================================

    let knowledge_base = match pipeline.build().await {
        Ok(kb) => kb,
        Err(e) => {
            shell::repl::report_startup_failure(&mut tokio::io::stderr(), &e)
                .await
                .context("terminal I/O failed")?;
            return Ok(());
        }
    };

    tracing::info!(
        "{} policy document(s) synced into {}",
        knowledge_base.report.synced_count(),
        config.cache_dir.display()
    );
    for skipped in &knowledge_base.report.skipped {
        eprintln!("Could not sync '{}': {}", skipped.name, skipped.reason);
    }

    // ========================================================================
    // QUESTION LOOP
    // ========================================================================

    let mut stdout = tokio::io::stdout();
    shell::repl::run(
        BufReader::new(tokio::io::stdin()),
        &mut stdout,
        &assistant,
        &knowledge_base.context,
    )
    .await
    .context("terminal I/O failed")?;

    Ok(())
}

/// `RUST_LOG` directives when present and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
