use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use super::{CredentialStore, Credentials, OAuthClient};

/// Refresh when the held token has less than this left.
const REFRESH_MARGIN_MS: i64 = 60_000;

/// Why a remote spreadsheet call cannot be attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Not authenticated with Google")]
    NotAuthenticated,
    #[error("Spreadsheet is not configured")]
    NotConfigured,
}

/// Access to one spreadsheet under one Google identity, captured per request.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub spreadsheet_id: String,
}

pub struct SessionManager {
    store: Arc<CredentialStore>,
    oauth: Arc<dyn OAuthClient>,
    spreadsheet_id: Option<String>,
}

impl SessionManager {
    pub fn new(
        store: Arc<CredentialStore>,
        oauth: Arc<dyn OAuthClient>,
        spreadsheet_id: Option<String>,
    ) -> Self {
        Self {
            store,
            oauth,
            spreadsheet_id,
        }
    }

    /// Builds a session from the held credentials, refreshing a token that is
    /// about to expire. Never touches the network when access is missing.
    pub async fn session(&self) -> Result<AuthSession, AccessError> {
        let creds = self
            .store
            .current()
            .await
            .filter(|c| c.access_token.is_some())
            .ok_or(AccessError::NotAuthenticated)?;
        let spreadsheet_id = self
            .spreadsheet_id
            .clone()
            .ok_or(AccessError::NotConfigured)?;

        let creds = self.refresh_if_expiring(creds).await;
        let access_token = creds.access_token.ok_or(AccessError::NotAuthenticated)?;
        Ok(AuthSession {
            access_token,
            spreadsheet_id,
        })
    }

    async fn refresh_if_expiring(&self, creds: Credentials) -> Credentials {
        if !creds.expires_within(Utc::now().timestamp_millis(), REFRESH_MARGIN_MS) {
            return creds;
        }
        let Some(refresh_token) = creds.refresh_token.as_deref() else {
            warn!("access token expiring and no refresh token held");
            return creds;
        };
        match self.oauth.refresh(refresh_token).await {
            Ok(partial) => self.on_tokens(partial).await,
            Err(e) => {
                error!(error = %e, "token refresh failed; using held token");
                creds
            }
        }
    }

    /// Post-refresh hook: memory is updated before returning, the file write
    /// runs detached so the in-flight request is not held up.
    async fn on_tokens(&self, partial: Credentials) -> Credentials {
        let merged = self.store.merge_in_memory(partial.clone()).await;
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.save_refreshed(partial).await {
                Ok(Some(_)) => debug!("refreshed credentials persisted"),
                Ok(None) => debug!("refreshed credentials discarded after disconnect"),
                Err(e) => error!(error = %e, "failed to persist refreshed credentials"),
            }
        });
        merged
    }
}
