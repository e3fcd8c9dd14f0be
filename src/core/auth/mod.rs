pub mod credential_models;
pub mod credential_service;

pub use credential_models::{AccessToken, DEFAULT_TOKEN_URI, DRIVE_READONLY_SCOPE};
pub use credential_service::{AuthError, AuthorizationFlow, CredentialStore, TokenStore};
