//! Range-addressed access to a Google spreadsheet (Sheets API v4).

use anyhow::Context;
use axum::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::auth::AuthSession;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Rows of `range`, trailing empty rows and cells omitted.
    async fn get_values(&self, session: &AuthSession, range: &str) -> anyhow::Result<Vec<Row>>;
    async fn append_values(
        &self,
        session: &AuthSession,
        range: &str,
        rows: Vec<Row>,
    ) -> anyhow::Result<()>;
    async fn update_values(
        &self,
        session: &AuthSession,
        range: &str,
        rows: Vec<Row>,
    ) -> anyhow::Result<()>;
    async fn list_sheets(&self, session: &AuthSession) -> anyhow::Result<Vec<SheetProperties>>;
    async fn add_sheet(&self, session: &AuthSession, title: &str) -> anyhow::Result<()>;
    /// Removes rows `[start, end)` (zero-based) of the sheet with grid id `sheet_id`.
    async fn delete_rows(
        &self,
        session: &AuthSession,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> anyhow::Result<()>;
}

pub struct GoogleSheets {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleSheets {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: SHEETS_BASE_URL.into(),
        }
    }

    fn values_url(&self, session: &AuthSession, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.base_url,
            urlencoding::encode(&session.spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    fn spreadsheet_url(&self, session: &AuthSession) -> String {
        format!(
            "{}/{}",
            self.base_url,
            urlencoding::encode(&session.spreadsheet_id)
        )
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> anyhow::Result<Value> {
        let res = req
            .send()
            .await
            .with_context(|| format!("sheets {what}"))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("read sheets {what} response"))?;
        if !status.is_success() {
            error!(%status, op = what, "sheets api error");
            anyhow::bail!("sheets {what} returned {status}: {body}");
        }
        debug!(op = what, "sheets call ok");
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).with_context(|| format!("decode sheets {what} response"))
    }

    async fn batch_update(&self, session: &AuthSession, request: Value) -> anyhow::Result<()> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url(session));
        let req = self
            .http
            .post(url)
            .bearer_auth(&session.access_token)
            .json(&json!({ "requests": [request] }));
        self.send(req, "batchUpdate").await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[async_trait]
impl SheetsClient for GoogleSheets {
    async fn get_values(&self, session: &AuthSession, range: &str) -> anyhow::Result<Vec<Row>> {
        let req = self
            .http
            .get(self.values_url(session, range))
            .bearer_auth(&session.access_token);
        let body = self.send(req, "values.get").await?;
        let vr: ValueRange = serde_json::from_value(body).context("decode value range")?;
        Ok(vr.values)
    }

    async fn append_values(
        &self,
        session: &AuthSession,
        range: &str,
        rows: Vec<Row>,
    ) -> anyhow::Result<()> {
        let url = format!("{}:append", self.values_url(session, range));
        let req = self
            .http
            .post(url)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&session.access_token)
            .json(&json!({ "values": rows }));
        self.send(req, "values.append").await?;
        Ok(())
    }

    async fn update_values(
        &self,
        session: &AuthSession,
        range: &str,
        rows: Vec<Row>,
    ) -> anyhow::Result<()> {
        let req = self
            .http
            .put(self.values_url(session, range))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(&session.access_token)
            .json(&json!({ "range": range, "values": rows }));
        self.send(req, "values.update").await?;
        Ok(())
    }

    async fn list_sheets(&self, session: &AuthSession) -> anyhow::Result<Vec<SheetProperties>> {
        let req = self
            .http
            .get(self.spreadsheet_url(session))
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .bearer_auth(&session.access_token);
        let body = self.send(req, "spreadsheets.get").await?;
        let meta: SpreadsheetMeta = serde_json::from_value(body).context("decode sheet list")?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    async fn add_sheet(&self, session: &AuthSession, title: &str) -> anyhow::Result<()> {
        self.batch_update(
            session,
            json!({ "addSheet": { "properties": { "title": title } } }),
        )
        .await
    }

    async fn delete_rows(
        &self,
        session: &AuthSession,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> anyhow::Result<()> {
        self.batch_update(
            session,
            json!({
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": end,
                    }
                }
            }),
        )
        .await
    }
}
