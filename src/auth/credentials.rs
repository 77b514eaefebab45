use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// OAuth token pair as persisted on disk (plain JSON, Google client field names).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    /// Overlays `self` on `previous`; fields missing from `self` keep their old value.
    pub fn merged_over(self, previous: &Credentials) -> Credentials {
        let mut extra = previous.extra.clone();
        extra.extend(self.extra);
        Credentials {
            access_token: self.access_token.or_else(|| previous.access_token.clone()),
            refresh_token: self.refresh_token.or_else(|| previous.refresh_token.clone()),
            scope: self.scope.or_else(|| previous.scope.clone()),
            token_type: self.token_type.or_else(|| previous.token_type.clone()),
            expiry_date: self.expiry_date.or(previous.expiry_date),
            id_token: self.id_token.or_else(|| previous.id_token.clone()),
            extra,
        }
    }

    pub fn expires_within(&self, now_ms: i64, margin_ms: i64) -> bool {
        self.expiry_date
            .map(|exp| exp <= now_ms + margin_ms)
            .unwrap_or(false)
    }
}

/// Single-record credential file plus the in-memory copy used for status checks.
pub struct CredentialStore {
    path: PathBuf,
    current: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(None),
        }
    }

    /// Opens the store and primes memory from disk. A missing or unreadable
    /// file leaves the store unauthenticated.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);
        match store.load().await {
            Ok(Some(creds)) => {
                info!(path = %store.path().display(), "loaded saved google credentials");
                *store.current.write().await = Some(creds);
            }
            Ok(None) => debug!(path = %store.path().display(), "no saved credentials"),
            Err(e) => warn!(error = %e, "could not read saved credentials"),
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> anyhow::Result<Option<Credentials>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        let creds = serde_json::from_str(&raw)
            .with_context(|| format!("parse {}", self.path.display()))?;
        Ok(Some(creds))
    }

    pub async fn current(&self) -> Option<Credentials> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|c| c.access_token.is_some())
    }

    /// Replaces the persisted record wholesale.
    pub async fn save(&self, creds: Credentials) -> anyhow::Result<()> {
        self.write_file(&creds).await?;
        *self.current.write().await = Some(creds);
        Ok(())
    }

    /// Applies a partial refresh payload to the in-memory record only. A
    /// cleared store stays cleared; the merged value is still returned.
    pub async fn merge_in_memory(&self, partial: Credentials) -> Credentials {
        let mut guard = self.current.write().await;
        match guard.as_mut() {
            Some(prev) => {
                let merged = partial.merged_over(prev);
                *prev = merged.clone();
                merged
            }
            None => partial,
        }
    }

    /// Merges a refresh payload over the persisted record and writes it back.
    /// Returns `None` without writing when the store was cleared meanwhile.
    pub async fn save_refreshed(
        &self,
        partial: Credentials,
    ) -> anyhow::Result<Option<Credentials>> {
        // held across the file write so `clear` cannot interleave
        let mut guard = self.current.write().await;
        let Some(held) = guard.as_ref() else {
            debug!("credentials cleared before refresh was persisted");
            return Ok(None);
        };
        let base = self.load().await?.unwrap_or_else(|| held.clone());
        let merged = partial.merged_over(&base);
        self.write_file(&merged).await?;
        let in_memory = merged.clone().merged_over(held);
        *guard = Some(in_memory);
        Ok(Some(merged))
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        let mut guard = self.current.write().await;
        *guard = None;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }

    async fn write_file(&self, creds: &Credentials) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(creds).context("serialize credentials")?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }
}
