use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use tracing::{error, instrument, warn};

use super::dto::{
    EntriesQuery, EntriesResponse, Macros, MacrosBody, SummaryQuery, SummaryResponse, Targets,
    UnauthenticatedResponse,
};
use super::summary::{summarize, Period};
use crate::{auth::SuccessResponse, clock, error::ApiError, state::AppState};

// Reads answer 200 with `authenticated: false` when access is missing; writes
// answer 401.

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/entries", get(list_entries))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/entries/:row_index", delete(delete_entry).put(update_entry))
        .route("/settings/targets", get(get_targets).put(put_targets))
}

#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    Query(q): Query<SummaryQuery>,
) -> Result<Response, ApiError> {
    let session = match state.sessions.session().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "summary requested without spreadsheet access");
            return Ok(Json(UnauthenticatedResponse {
                error: e.to_string(),
                authenticated: false,
            })
            .into_response());
        }
    };

    let period = Period::parse(q.period.as_deref());
    let tz = clock::resolve_timezone(q.timezone.as_deref());
    let entries = state.ledger.list(&session, None).await.map_err(|e| {
        error!(error = %e, "summary read failed");
        ApiError::from(e)
    })?;
    let summary = summarize(&entries, period, Utc::now(), tz);
    Ok(Json(SummaryResponse {
        summary,
        authenticated: true,
    })
    .into_response())
}

#[instrument(skip(state))]
pub async fn list_entries(
    State(state): State<AppState>,
    Query(q): Query<EntriesQuery>,
) -> Result<Json<EntriesResponse>, ApiError> {
    let session = match state.sessions.session().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "entries requested without spreadsheet access");
            return Ok(Json(EntriesResponse {
                entries: Vec::new(),
                authenticated: false,
            }));
        }
    };

    let date = q.date.filter(|d| !d.trim().is_empty()).unwrap_or_else(|| {
        clock::local_date_string(Utc::now(), clock::resolve_timezone(q.timezone.as_deref()))
    });
    let entries = state
        .ledger
        .list(&session, Some(&date))
        .await
        .map_err(|e| {
            error!(error = %e, %date, "entries read failed");
            ApiError::from(e)
        })?;
    Ok(Json(EntriesResponse {
        entries,
        authenticated: true,
    }))
}

#[instrument(skip(state))]
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(row_index): Path<usize>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let session = state.sessions.session().await?;
    state
        .ledger
        .delete(&session, row_index)
        .await
        .map_err(|e| {
            error!(error = %e, row_index, "delete entry failed");
            ApiError::from(e)
        })?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Access is checked before the body, so a bad body from an unauthenticated
/// caller still answers 401.
fn require_macros(body: Result<Json<MacrosBody>, JsonRejection>) -> Result<Macros, ApiError> {
    let Json(body) = body?;
    body.into_macros().ok_or_else(|| {
        ApiError::Validation("calories, protein, carbs and fat are required".into())
    })
}

#[instrument(skip(state, body))]
pub async fn update_entry(
    State(state): State<AppState>,
    Path(row_index): Path<usize>,
    body: Result<Json<MacrosBody>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let session = state.sessions.session().await?;
    let macros = require_macros(body)?;
    state
        .ledger
        .update(&session, row_index, &macros)
        .await
        .map_err(|e| {
            error!(error = %e, row_index, "update entry failed");
            ApiError::from(e)
        })?;
    Ok(Json(SuccessResponse { success: true }))
}

#[instrument(skip(state))]
pub async fn get_targets(State(state): State<AppState>) -> Result<Json<Targets>, ApiError> {
    let session = state.sessions.session().await?;
    Ok(Json(state.targets.get(&session).await))
}

#[instrument(skip(state, body))]
pub async fn put_targets(
    State(state): State<AppState>,
    body: Result<Json<MacrosBody>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let session = state.sessions.session().await?;
    let targets = require_macros(body)?;
    state.targets.set(&session, &targets).await.map_err(|e| {
        error!(error = %e, "saving targets failed");
        ApiError::from(e)
    })?;
    Ok(Json(SuccessResponse { success: true }))
}
