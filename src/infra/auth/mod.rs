pub mod google_oauth;
pub mod json_token_store;

pub use google_oauth::GoogleOAuthFlow;
pub use json_token_store::JsonTokenStore;
