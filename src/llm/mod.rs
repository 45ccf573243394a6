pub mod client;
pub mod provider;

pub use client::LlmClient;
pub use provider::{create_provider, VisionProvider};
