//! Google OAuth2 authorization-code flow for the spreadsheet scope.

use anyhow::Context;
use axum::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use super::Credentials;
use crate::config::GoogleConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Consent URL requesting offline access with forced re-consent.
    fn authorize_url(&self) -> String;
    async fn exchange_code(&self, code: &str) -> anyhow::Result<Credentials>;
    /// May return a partial record (Google omits `refresh_token` on refresh).
    async fn refresh(&self, refresh_token: &str) -> anyhow::Result<Credentials>;
}

pub struct GoogleOAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(http: reqwest::Client, cfg: &GoogleConfig) -> Self {
        Self {
            http,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
        }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> anyhow::Result<Credentials> {
        let res = self
            .http
            .post(TOKEN_ENDPOINT)
            .form(params)
            .send()
            .await
            .context("google token request")?;
        let status = res.status();
        let body = res.text().await.context("read google token response")?;
        if !status.is_success() {
            error!(%status, "google token endpoint rejected request");
            anyhow::bail!("token endpoint returned {status}: {}", token_error(&body));
        }
        parse_token_response(&body, Utc::now().timestamp_millis())
    }
}

#[async_trait]
impl OAuthClient for GoogleOAuth {
    fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            AUTH_ENDPOINT,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SPREADSHEETS_SCOPE),
        )
    }

    async fn exchange_code(&self, code: &str) -> anyhow::Result<Credentials> {
        info!("exchanging authorization code");
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> anyhow::Result<Credentials> {
        info!("refreshing google access token");
        self.token_request(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    token_type: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    error_description: Option<String>,
}

fn token_error(body: &str) -> String {
    match serde_json::from_str::<TokenErrorBody>(body) {
        Ok(TokenErrorBody {
            error,
            error_description: Some(desc),
        }) => format!("{error}: {desc}"),
        Ok(TokenErrorBody { error, .. }) => error,
        Err(_) => body.to_string(),
    }
}

fn parse_token_response(body: &str, now_ms: i64) -> anyhow::Result<Credentials> {
    let t: TokenResponse = serde_json::from_str(body).context("invalid token response")?;
    Ok(Credentials {
        access_token: Some(t.access_token),
        refresh_token: t.refresh_token,
        scope: t.scope,
        token_type: t.token_type,
        expiry_date: t.expires_in.map(|secs| now_ms + secs * 1000),
        id_token: t.id_token,
        extra: Default::default(),
    })
}
