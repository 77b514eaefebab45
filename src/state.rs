use crate::auth::{CredentialStore, GoogleOAuth, OAuthClient, SessionManager};
use crate::config::AppConfig;
use crate::ledger::{GoogleSheets, LedgerStore, SheetsClient, TargetsStore};
use crate::nutrition::{AnthropicClient, CompletionClient};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const GOOGLE_TIMEOUT: Duration = Duration::from_secs(30);
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<CredentialStore>,
    pub oauth: Arc<dyn OAuthClient>,
    pub sessions: Arc<SessionManager>,
    pub ledger: Arc<LedgerStore>,
    pub targets: Arc<TargetsStore>,
    pub completion: Arc<dyn CompletionClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let google_http = reqwest::Client::builder()
            .timeout(GOOGLE_TIMEOUT)
            .build()
            .context("build google http client")?;
        let completion_http = reqwest::Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .build()
            .context("build completion http client")?;

        let credentials = Arc::new(CredentialStore::open(&config.token_path).await);
        let oauth: Arc<dyn OAuthClient> =
            Arc::new(GoogleOAuth::new(google_http.clone(), &config.google));
        let sheets: Arc<dyn SheetsClient> = Arc::new(GoogleSheets::new(google_http));
        let completion: Arc<dyn CompletionClient> =
            Arc::new(AnthropicClient::new(completion_http, &config.anthropic));

        Ok(Self::from_parts(config, credentials, oauth, sheets, completion))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        credentials: Arc<CredentialStore>,
        oauth: Arc<dyn OAuthClient>,
        sheets: Arc<dyn SheetsClient>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&credentials),
            Arc::clone(&oauth),
            config.spreadsheet_id.clone(),
        ));
        let ledger = Arc::new(LedgerStore::new(Arc::clone(&sheets), config.ledger_sheet.clone()));
        let targets = Arc::new(TargetsStore::new(sheets));
        Self {
            config,
            credentials,
            oauth,
            sessions,
            ledger,
            targets,
            completion,
        }
    }
}

/// In-memory wiring for route tests. Keeps the temp dir holding the
/// credential file alive for the life of the fixture.
#[cfg(test)]
pub struct Fixture {
    pub state: AppState,
    pub sheets: Arc<crate::fakes::FakeSheets>,
    pub completion: Arc<crate::fakes::FakeCompletion>,
    _dir: tempfile::TempDir,
}

#[cfg(test)]
impl AppState {
    pub async fn fake() -> Fixture {
        Self::fake_with(false, Some("test-spreadsheet")).await
    }

    pub async fn fake_authenticated() -> Fixture {
        Self::fake_with(true, Some("test-spreadsheet")).await
    }

    pub async fn fake_with(authenticated: bool, spreadsheet_id: Option<&str>) -> Fixture {
        use crate::auth::Credentials;
        use crate::config::{AnthropicConfig, GoogleConfig};
        use crate::fakes::{FakeCompletion, FakeOAuth, FakeSheets};

        let dir = tempfile::tempdir().expect("tempdir");
        let token_path = dir.path().join("tokens.json");
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            anthropic: AnthropicConfig {
                api_key: "test".into(),
                model: "test".into(),
                base_url: "http://localhost".into(),
            },
            google: GoogleConfig {
                client_id: "test".into(),
                client_secret: "test".into(),
                redirect_uri: "http://localhost/auth/google/callback".into(),
            },
            spreadsheet_id: spreadsheet_id.map(String::from),
            ledger_sheet: "Sheet1".into(),
            token_path: token_path.display().to_string(),
            static_dir: dir.path().display().to_string(),
        });

        let credentials = Arc::new(CredentialStore::new(token_path));
        if authenticated {
            credentials
                .save(Credentials {
                    access_token: Some("ya29.test".into()),
                    refresh_token: Some("1//test".into()),
                    ..Default::default()
                })
                .await
                .expect("seed credentials");
        }

        let sheets = Arc::new(FakeSheets::with_ledger_header("Sheet1"));
        let completion = Arc::new(FakeCompletion::replying("{}"));
        let state = Self::from_parts(
            config,
            credentials,
            Arc::new(FakeOAuth::default()),
            sheets.clone(),
            completion.clone(),
        );
        Fixture {
            state,
            sheets,
            completion,
            _dir: dir,
        }
    }
}
