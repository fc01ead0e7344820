pub mod client;
pub mod gateway;
pub mod history;
pub mod http;

pub mod mock;

pub use client::{CompletionClient, CompletionRequest, WireMessage};
pub use gateway::AssistantGateway;
pub use history::SessionHistory;
pub use http::HttpCompletionClient;
