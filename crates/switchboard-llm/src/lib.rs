pub mod client;
pub mod handler;
pub mod streaming;

pub use client::OpenAiClient;
pub use handler::LlmHandler;
