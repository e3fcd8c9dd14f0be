// The infra module contains implementations of core traits.
// Each external system gets its own submodule.

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "drive/mod.rs"]
pub mod drive;

#[path = "docx/mod.rs"]
pub mod docx;

#[path = "ai/mod.rs"]
pub mod ai;
