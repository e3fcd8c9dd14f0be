// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "drive/mod.rs"]
pub mod drive;

#[path = "corpus/corpus_service.rs"]
pub mod corpus;

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "pipeline/pipeline_service.rs"]
pub mod pipeline;
