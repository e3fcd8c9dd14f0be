pub mod openai_client;

pub use openai_client::{is_usable_api_key, OpenAiClient, DEFAULT_BASE_URL};
