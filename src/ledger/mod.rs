use crate::auth::AccessError;
use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod sheets;
pub mod store;
pub mod summary;
pub mod targets;

pub use sheets::{GoogleSheets, SheetsClient};
pub use store::LedgerStore;
pub use targets::TargetsStore;

/// Outcome of a ledger or targets operation that did not complete.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not authenticated with Google")]
    NotAuthenticated,
    #[error("Spreadsheet is not configured")]
    NotConfigured,
    #[error("Invalid row index {0}")]
    InvalidRow(usize),
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl From<AccessError> for StoreError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::NotAuthenticated => StoreError::NotAuthenticated,
            AccessError::NotConfigured => StoreError::NotConfigured,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
