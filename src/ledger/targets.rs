use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tracing::{info, warn};

use super::dto::Targets;
use super::sheets::SheetsClient;
use super::store::cell_number;
use super::StoreError;
use crate::auth::AuthSession;

pub const SETTINGS_SHEET: &str = "Settings";
const HEADER_RANGE: &str = "Settings!A1:D1";
const VALUES_RANGE: &str = "Settings!A2:D2";

pub const DEFAULT_TARGETS: Targets = Targets {
    calories: 1800.0,
    protein: 180.0,
    carbs: 115.0,
    fat: 65.0,
};

/// Daily macro goals kept in the `Settings` sheet, one header and one data row.
pub struct TargetsStore {
    sheets: Arc<dyn SheetsClient>,
}

impl TargetsStore {
    pub fn new(sheets: Arc<dyn SheetsClient>) -> Self {
        Self { sheets }
    }

    /// Never fails on a missing sheet or empty range; both read as defaults.
    pub async fn get(&self, session: &AuthSession) -> Targets {
        let rows = match self.sheets.get_values(session, VALUES_RANGE).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "targets range unreadable, using defaults");
                return DEFAULT_TARGETS;
            }
        };
        let Some(row) = rows.first().filter(|r| !r.is_empty()) else {
            return DEFAULT_TARGETS;
        };
        let field = |i: usize, fallback: f64| row.get(i).map(cell_number).unwrap_or(fallback);
        Targets {
            calories: field(0, DEFAULT_TARGETS.calories),
            protein: field(1, DEFAULT_TARGETS.protein),
            carbs: field(2, DEFAULT_TARGETS.carbs),
            fat: field(3, DEFAULT_TARGETS.fat),
        }
    }

    pub async fn set(&self, session: &AuthSession, targets: &Targets) -> Result<(), StoreError> {
        let sheets = self
            .sheets
            .list_sheets(session)
            .await
            .context("list sheets")?;
        if !sheets.iter().any(|s| s.title == SETTINGS_SHEET) {
            self.sheets
                .add_sheet(session, SETTINGS_SHEET)
                .await
                .context("create settings sheet")?;
            self.sheets
                .update_values(
                    session,
                    HEADER_RANGE,
                    vec![vec![
                        json!("Calories"),
                        json!("Protein"),
                        json!("Carbs"),
                        json!("Fat"),
                    ]],
                )
                .await
                .context("write settings header")?;
            info!("settings sheet created");
        }
        self.sheets
            .update_values(
                session,
                VALUES_RANGE,
                vec![vec![
                    json!(targets.calories),
                    json!(targets.protein),
                    json!(targets.carbs),
                    json!(targets.fat),
                ]],
            )
            .await
            .context("write targets")?;
        info!(?targets, "targets saved");
        Ok(())
    }
}
