use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use super::dto::{AnalyzeRequest, AnalyzeResponse, ConfirmRequest, ConfirmResponse, FoodPayload};
use super::estimator::{estimate, ImageInput};
use crate::{
    clock,
    error::ApiError,
    ledger::dto::{Macros, NewEntry},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/confirm", post(confirm))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // photos arrive inline
}

/// Estimates only; nothing is written to the ledger.
#[instrument(skip(state, body))]
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(body) = body?;
    let image = body
        .image
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .map(ImageInput::from_data_url);
    let has_food = body.food.as_deref().is_some_and(|f| !f.trim().is_empty());
    if !has_food && image.is_none() {
        return Err(ApiError::Validation(
            "Food description or image is required".into(),
        ));
    }

    let record = estimate(state.completion.as_ref(), body.food.as_deref(), image)
        .await
        .map_err(|e| {
            error!(error = %e, "nutrition estimate failed");
            ApiError::from(e)
        })?;

    let tz = clock::resolve_timezone(body.timezone.as_deref());
    let now = Utc::now();
    let date = body
        .date
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| clock::local_date_string(now, tz));
    let time = clock::local_time_string(now, tz);

    info!(food = %record.food, calories = record.calories, "food analyzed");
    Ok(Json(AnalyzeResponse {
        payload: FoodPayload::from_record(record, date, time),
        logged: false,
    }))
}

/// Appends the confirmed estimate. Ledger trouble downgrades the reply to
/// `logged: false` instead of failing the request.
#[instrument(skip(state, body))]
pub async fn confirm(
    State(state): State<AppState>,
    body: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let Json(body) = body?;
    let food = body
        .food
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::Validation("Food is required".into()))?;

    let tz = clock::resolve_timezone(body.timezone.as_deref());
    let now = Utc::now();
    let date = body
        .date
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| clock::local_date_string(now, tz));
    let time = body
        .time
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| clock::local_time_string(now, tz));

    let payload = FoodPayload {
        food,
        calories: body.calories,
        protein: body.protein,
        carbs: body.carbs,
        fat: body.fat,
        date,
        time,
    };
    let (logged, row_index) = log_entry(&state, &payload).await;

    Ok(Json(ConfirmResponse {
        payload,
        logged,
        row_index,
    }))
}

async fn log_entry(state: &AppState, payload: &FoodPayload) -> (bool, Option<usize>) {
    let session = match state.sessions.session().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "not logging entry");
            return (false, None);
        }
    };
    let entry = NewEntry {
        date: payload.date.clone(),
        time: payload.time.clone(),
        food: payload.food.clone(),
        macros: Macros {
            calories: payload.calories,
            protein: payload.protein,
            carbs: payload.carbs,
            fat: payload.fat,
        },
    };
    if let Err(e) = state.ledger.append(&session, &entry).await {
        error!(error = %e, "ledger append failed");
        return (false, None);
    }

    // the append reports no index, re-read the day to find it
    let row_index = match state.ledger.list(&session, Some(&entry.date)).await {
        Ok(entries) => entries.last().map(|e| e.row_index),
        Err(e) => {
            warn!(error = %e, "could not re-read ledger after append");
            None
        }
    };
    (true, row_index)
}
