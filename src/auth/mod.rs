use crate::state::AppState;
use axum::Router;

pub mod credentials;
mod dto;
pub mod google;
pub mod handlers;
pub mod session;

pub use credentials::{CredentialStore, Credentials};
pub use google::{GoogleOAuth, OAuthClient};
pub use session::{AccessError, AuthSession, SessionManager};

pub(crate) use dto::SuccessResponse;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
