//! Food log rows in one `A:G` range: date, time, food, calories, protein, carbs, fat.
//!
//! `row_index` is a logical offset recomputed on every read (header excluded).
//! It is not a stable id: deleting a row shifts every later index down by one.

use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::dto::{LedgerEntry, Macros, NewEntry};
use super::sheets::{Row, SheetsClient};
use super::StoreError;
use crate::auth::AuthSession;

/// Physical (1-based) sheet row of logical `row_index`: one for 1-basing, one
/// for the header row. `None` when the index has no addressable row.
pub fn physical_row(row_index: usize) -> Option<usize> {
    row_index.checked_add(2)
}

pub struct LedgerStore {
    sheets: Arc<dyn SheetsClient>,
    sheet_title: String,
}

impl LedgerStore {
    pub fn new(sheets: Arc<dyn SheetsClient>, sheet_title: impl Into<String>) -> Self {
        Self {
            sheets,
            sheet_title: sheet_title.into(),
        }
    }

    fn range(&self) -> String {
        format!("{}!A:G", self.sheet_title)
    }

    pub async fn append(&self, session: &AuthSession, entry: &NewEntry) -> Result<(), StoreError> {
        let row = vec![
            json!(entry.date),
            json!(entry.time),
            json!(entry.food),
            json!(entry.macros.calories),
            json!(entry.macros.protein),
            json!(entry.macros.carbs),
            json!(entry.macros.fat),
        ];
        self.sheets
            .append_values(session, &self.range(), vec![row])
            .await
            .context("append ledger row")?;
        info!(date = %entry.date, food = %entry.food, "ledger row appended");
        Ok(())
    }

    /// All entries, or only those whose date cell equals `date` exactly.
    pub async fn list(
        &self,
        session: &AuthSession,
        date: Option<&str>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = self
            .sheets
            .get_values(session, &self.range())
            .await
            .context("read ledger rows")?;
        let entries: Vec<LedgerEntry> = entries_from_rows(rows)
            .into_iter()
            .filter(|e| date.map_or(true, |d| e.date == d))
            .collect();
        debug!(count = entries.len(), ?date, "ledger entries listed");
        Ok(entries)
    }

    /// Rewrites columns D:G of one entry.
    pub async fn update(
        &self,
        session: &AuthSession,
        row_index: usize,
        macros: &Macros,
    ) -> Result<(), StoreError> {
        let row = physical_row(row_index).ok_or(StoreError::InvalidRow(row_index))?;
        let range = format!("{}!D{row}:G{row}", self.sheet_title);
        let values = vec![vec![
            json!(macros.calories),
            json!(macros.protein),
            json!(macros.carbs),
            json!(macros.fat),
        ]];
        self.sheets
            .update_values(session, &range, values)
            .await
            .context("update ledger row")?;
        info!(row_index, "ledger row updated");
        Ok(())
    }

    /// Removes one entry from the ledger sheet, located by title. A missing
    /// ledger sheet is an error; no other grid is touched.
    pub async fn delete(&self, session: &AuthSession, row_index: usize) -> Result<(), StoreError> {
        let end = physical_row(row_index).ok_or(StoreError::InvalidRow(row_index))?;
        let sheets = self
            .sheets
            .list_sheets(session)
            .await
            .context("list sheets")?;
        let sheet_id = sheets
            .iter()
            .find(|s| s.title == self.sheet_title)
            .map(|s| s.sheet_id)
            .with_context(|| format!("ledger sheet {} not found", self.sheet_title))?;
        // zero-based [start, end) of the physical row
        self.sheets
            .delete_rows(session, sheet_id, end - 1, end)
            .await
            .context("delete ledger row")?;
        info!(row_index, "ledger row deleted");
        Ok(())
    }
}

/// Drops the header row (first cell "date", any case) and numbers the rest.
pub fn entries_from_rows(mut rows: Vec<Row>) -> Vec<LedgerEntry> {
    let has_header = rows
        .first()
        .and_then(|r| r.first())
        .is_some_and(|c| cell_text(c).trim().eq_ignore_ascii_case("date"));
    if has_header {
        rows.remove(0);
    }
    rows.iter()
        .enumerate()
        .map(|(row_index, row)| {
            let text = |i: usize| row.get(i).map(cell_text).unwrap_or_default();
            let num = |i: usize| row.get(i).map(cell_number).unwrap_or(0.0);
            LedgerEntry {
                date: text(0),
                time: text(1),
                food: text(2),
                macros: Macros {
                    calories: num(3),
                    protein: num(4),
                    carbs: num(5),
                    fat: num(6),
                },
                row_index,
            }
        })
        .collect()
}

pub fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric cell as f64; formatted strings like "1,200" are accepted, junk is 0.
pub fn cell_number(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', "").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
