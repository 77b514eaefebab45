use crate::state::AppState;
use axum::Router;

mod dto;
pub mod estimator;
pub mod handlers;

pub use estimator::{AnthropicClient, CompletionClient};

#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("food description or image is required")]
    MissingInput,
    #[error("completion request failed: {0}")]
    Upstream(anyhow::Error),
    #[error("{0}")]
    Malformed(String),
}

pub fn router() -> Router<AppState> {
    handlers::routes()
}
