use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub anthropic: AnthropicConfig,
    pub google: GoogleConfig,
    pub spreadsheet_id: Option<String>,
    pub ledger_sheet: String,
    pub token_path: String,
    pub static_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let port = get("PORT")
            .or_else(|| get("APP_PORT"))
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        let base_url = public_base_url(&get, port);

        let anthropic = AnthropicConfig {
            api_key: required("ANTHROPIC_API_KEY")?,
            model: get("ANTHROPIC_MODEL").unwrap_or_else(|| "claude-sonnet-4-20250514".into()),
            base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| "https://api.anthropic.com".into()),
        };
        let google = GoogleConfig {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: format!("{}/auth/google/callback", base_url.trim_end_matches('/')),
        };

        Ok(Self {
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            anthropic,
            google,
            spreadsheet_id: get("SPREADSHEET_ID"),
            ledger_sheet: get("LEDGER_SHEET").unwrap_or_else(|| "Sheet1".into()),
            token_path: get("TOKEN_PATH").unwrap_or_else(|| "tokens.json".into()),
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "public".into()),
        })
    }
}

// Deployment platforms expose the public hostname under their own variable names.
fn public_base_url<F>(get: &F, port: u16) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = get("PUBLIC_BASE_URL") {
        return url;
    }
    if let Some(domain) = get("RAILWAY_PUBLIC_DOMAIN") {
        return format!("https://{domain}");
    }
    if let Some(domain) = get("REPLIT_DEV_DOMAIN") {
        return format!("https://{domain}");
    }
    format!("http://localhost:{port}")
}
