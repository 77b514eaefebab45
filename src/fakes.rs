//! In-memory stand-ins for the remote services, used by unit and route tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use axum::{async_trait, response::Response};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::auth::{AuthSession, Credentials, OAuthClient};
use crate::ledger::sheets::{Row, SheetProperties, SheetsClient};
use crate::nutrition::estimator::{CompletionClient, CompletionRequest};

pub async fn json_body(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ---- sheets ----

struct FakeSheet {
    id: i64,
    title: String,
    rows: Vec<Row>,
}

/// A1 range such as `Sheet1!A:G` or `Settings!A2:D2`, zero-based.
struct A1 {
    title: String,
    first_col: usize,
    last_col: usize,
    first_row: usize,
    last_row: Option<usize>,
}

fn col_index(letters: &str) -> usize {
    letters
        .bytes()
        .fold(0, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1
}

fn parse_a1(range: &str) -> A1 {
    lazy_static! {
        static ref A1_RE: Regex =
            Regex::new(r"^([^!]+)!([A-Z]+)(\d+)?(?::([A-Z]+)(\d+)?)?$").unwrap();
    }
    let caps = A1_RE.captures(range).unwrap_or_else(|| panic!("bad range {range}"));
    let first_col = col_index(&caps[2]);
    let num = |i: usize| caps.get(i).map(|m| m.as_str().parse::<usize>().unwrap() - 1);
    let first_row = num(3).unwrap_or(0);
    let last_row = match caps.get(4) {
        Some(_) => num(5),
        None => num(3),
    };
    A1 {
        title: caps[1].to_string(),
        first_col,
        last_col: caps.get(4).map(|m| col_index(m.as_str())).unwrap_or(first_col),
        first_row,
        last_row,
    }
}

#[derive(Default)]
pub struct FakeSheets {
    sheets: Mutex<Vec<FakeSheet>>,
    calls: AtomicUsize,
    fail: AtomicBool,
    writes: Mutex<Vec<String>>,
}

impl FakeSheets {
    pub fn with_ledger_header(title: &str) -> Self {
        let fake = Self::default();
        fake.insert_sheet(
            title,
            vec![["Date", "Time", "Food", "Calories", "Protein", "Carbs", "Fat"]
                .iter()
                .map(|h| json!(h))
                .collect()],
        );
        fake
    }

    pub fn insert_sheet(&self, title: &str, rows: Vec<Row>) {
        let mut sheets = self.sheets.lock().unwrap();
        let id = sheets.iter().map(|s| s.id + 1).max().unwrap_or(0);
        sheets.push(FakeSheet {
            id,
            title: title.to_string(),
            rows,
        });
    }

    pub fn push_ledger_row(&self, row: Row) {
        let mut sheets = self.sheets.lock().unwrap();
        let ledger = sheets.iter_mut().find(|s| s.title == "Sheet1").unwrap();
        ledger.rows.push(row);
    }

    pub fn sheet_rows(&self, title: &str) -> Option<Vec<Row>> {
        let sheets = self.sheets.lock().unwrap();
        sheets.iter().find(|s| s.title == title).map(|s| s.rows.clone())
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.lock().unwrap().len()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn ranges_written(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    fn enter(&self, op: &str) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("sheets {op} returned 503 Service Unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl SheetsClient for FakeSheets {
    async fn get_values(&self, _s: &AuthSession, range: &str) -> anyhow::Result<Vec<Row>> {
        self.enter("values.get")?;
        let a1 = parse_a1(range);
        let sheets = self.sheets.lock().unwrap();
        let Some(sheet) = sheets.iter().find(|s| s.title == a1.title) else {
            anyhow::bail!("sheets values.get returned 400: Unable to parse range: {range}");
        };
        let last_row = a1
            .last_row
            .unwrap_or(usize::MAX)
            .min(sheet.rows.len().saturating_sub(1));
        let mut out: Vec<Row> = Vec::new();
        for r in a1.first_row..=last_row {
            let Some(row) = sheet.rows.get(r) else { break };
            let mut cells: Row = (a1.first_col..=a1.last_col)
                .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            while cells.last().is_some_and(Value::is_null) {
                cells.pop();
            }
            out.push(cells);
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn append_values(&self, _s: &AuthSession, range: &str, rows: Vec<Row>) -> anyhow::Result<()> {
        self.enter("values.append")?;
        let a1 = parse_a1(range);
        let mut sheets = self.sheets.lock().unwrap();
        let Some(sheet) = sheets.iter_mut().find(|s| s.title == a1.title) else {
            anyhow::bail!("sheets values.append returned 400: Unable to parse range: {range}");
        };
        sheet.rows.extend(rows);
        Ok(())
    }

    async fn update_values(&self, _s: &AuthSession, range: &str, rows: Vec<Row>) -> anyhow::Result<()> {
        self.enter("values.update")?;
        let a1 = parse_a1(range);
        let mut sheets = self.sheets.lock().unwrap();
        let Some(sheet) = sheets.iter_mut().find(|s| s.title == a1.title) else {
            anyhow::bail!("sheets values.update returned 400: Unable to parse range: {range}");
        };
        for (i, row) in rows.into_iter().enumerate() {
            let r = a1.first_row + i;
            if sheet.rows.len() <= r {
                sheet.rows.resize(r + 1, Vec::new());
            }
            for (j, cell) in row.into_iter().enumerate() {
                let c = a1.first_col + j;
                let target = &mut sheet.rows[r];
                if target.len() <= c {
                    target.resize(c + 1, Value::Null);
                }
                target[c] = cell;
            }
        }
        self.writes.lock().unwrap().push(range.to_string());
        Ok(())
    }

    async fn list_sheets(&self, _s: &AuthSession) -> anyhow::Result<Vec<SheetProperties>> {
        self.enter("spreadsheets.get")?;
        let sheets = self.sheets.lock().unwrap();
        Ok(sheets
            .iter()
            .map(|s| SheetProperties {
                sheet_id: s.id,
                title: s.title.clone(),
            })
            .collect())
    }

    async fn add_sheet(&self, _s: &AuthSession, title: &str) -> anyhow::Result<()> {
        self.enter("batchUpdate")?;
        if self.sheet_rows(title).is_some() {
            anyhow::bail!("sheets batchUpdate returned 400: sheet {title} already exists");
        }
        self.insert_sheet(title, Vec::new());
        Ok(())
    }

    async fn delete_rows(
        &self,
        _s: &AuthSession,
        sheet_id: i64,
        start: usize,
        end: usize,
    ) -> anyhow::Result<()> {
        self.enter("batchUpdate")?;
        let mut sheets = self.sheets.lock().unwrap();
        let Some(sheet) = sheets.iter_mut().find(|s| s.id == sheet_id) else {
            anyhow::bail!("sheets batchUpdate returned 400: no grid with id {sheet_id}");
        };
        let end = end.min(sheet.rows.len());
        if start < end {
            sheet.rows.drain(start..end);
        }
        Ok(())
    }
}

// ---- completion ----

pub struct FakeCompletion {
    reply: Mutex<String>,
    last: Mutex<Option<CompletionRequest>>,
}

impl FakeCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Mutex::new(reply.to_string()),
            last: Mutex::new(None),
        }
    }

    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = reply.to_string();
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(self.reply.lock().unwrap().clone())
    }
}

// ---- oauth ----

#[derive(Default)]
pub struct FakeOAuth {
    refreshes: AtomicUsize,
}

impl FakeOAuth {
    pub fn refresh_calls(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthClient for FakeOAuth {
    fn authorize_url(&self) -> String {
        "https://accounts.example/o/oauth2/v2/auth?access_type=offline&prompt=consent".into()
    }

    async fn exchange_code(&self, code: &str) -> anyhow::Result<Credentials> {
        if code != "good" {
            anyhow::bail!("token endpoint returned 400 Bad Request: invalid_grant");
        }
        Ok(Credentials {
            access_token: Some("ya29.exchanged".into()),
            refresh_token: Some("1//exchanged".into()),
            token_type: Some("Bearer".into()),
            expiry_date: Some(Utc::now().timestamp_millis() + 3_600_000),
            ..Default::default()
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> anyhow::Result<Credentials> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(Credentials {
            access_token: Some("ya29.refreshed".into()),
            expiry_date: Some(Utc::now().timestamp_millis() + 3_600_000),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod fake_tests {
    use super::*;

    #[test]
    fn a1_ranges() {
        let r = parse_a1("Sheet1!A:G");
        assert_eq!((r.first_col, r.last_col, r.first_row, r.last_row), (0, 6, 0, None));
        let r = parse_a1("Sheet1!D5:G5");
        assert_eq!((r.first_col, r.last_col, r.first_row, r.last_row), (3, 6, 4, Some(4)));
        let r = parse_a1("Settings!A2:D2");
        assert_eq!(r.title, "Settings");
        assert_eq!((r.first_row, r.last_row), (1, Some(1)));
    }
}
