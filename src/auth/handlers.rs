use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::dto::{CallbackQuery, StatusResponse, SuccessResponse},
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/status", get(status))
        .route("/auth/google", get(begin))
        .route("/auth/google/callback", get(callback))
        .route("/auth/disconnect", post(disconnect))
}

#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        authenticated: state.credentials.is_authenticated().await,
    })
}

#[instrument(skip(state))]
pub async fn begin(State(state): State<AppState>) -> Response {
    found(&state.oauth.authorize_url())
}

#[instrument(skip(state, q))]
pub async fn callback(State(state): State<AppState>, Query(q): Query<CallbackQuery>) -> Response {
    let code = match (q.code, q.error) {
        (Some(code), _) if !code.is_empty() => code,
        (_, provider_error) => {
            warn!(error = ?provider_error, "oauth callback without code");
            return found("/?error=auth_failed");
        }
    };

    let creds = match state.oauth.exchange_code(&code).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "authorization code exchange failed");
            return found("/?error=auth_failed");
        }
    };

    if let Err(e) = state.credentials.save(creds).await {
        error!(error = %e, "saving credentials failed");
        return found("/?error=auth_failed");
    }

    info!("google account connected");
    found("/?authenticated=true")
}

/// Plain 302, which browsers follow for the OAuth round trip.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[instrument(skip(state))]
pub async fn disconnect(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.credentials.clear().await.map_err(|e| {
        error!(error = %e, "clearing credentials failed");
        ApiError::Remote(e)
    })?;
    info!("google account disconnected");
    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod auth_route_tests {
    use axum::{
        body::Body,
        http::{Method, Request},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{app::build_app, auth::Credentials, fakes::json_body, state::AppState};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn location(res: &axum::response::Response) -> &str {
        res.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn status_reflects_held_token() {
        let fx = AppState::fake().await;
        let res = build_app(fx.state.clone())
            .oneshot(get("/auth/status"))
            .await
            .unwrap();
        assert_eq!(json_body(res).await["authenticated"], false);

        fx.state
            .credentials
            .save(Credentials {
                access_token: Some("a".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let res = build_app(fx.state.clone())
            .oneshot(get("/auth/status"))
            .await
            .unwrap();
        assert_eq!(json_body(res).await["authenticated"], true);
    }

    #[tokio::test]
    async fn begin_redirects_to_provider() {
        let fx = AppState::fake().await;
        let res = build_app(fx.state).oneshot(get("/auth/google")).await.unwrap();
        assert_eq!(res.status(), StatusCode::FOUND);
        assert!(location(&res).contains("prompt=consent"));
    }

    #[tokio::test]
    async fn callback_success_and_failure() {
        let fx = AppState::fake().await;
        let res = build_app(fx.state.clone())
            .oneshot(get("/auth/google/callback?code=bad"))
            .await
            .unwrap();
        assert_eq!(location(&res), "/?error=auth_failed");
        assert!(!fx.state.credentials.is_authenticated().await);

        let res = build_app(fx.state.clone())
            .oneshot(get("/auth/google/callback"))
            .await
            .unwrap();
        assert_eq!(location(&res), "/?error=auth_failed");

        let res = build_app(fx.state.clone())
            .oneshot(get("/auth/google/callback?code=good"))
            .await
            .unwrap();
        assert_eq!(location(&res), "/?authenticated=true");
        assert!(fx.state.credentials.is_authenticated().await);
        assert!(fx.state.credentials.path().exists());
    }

    #[tokio::test]
    async fn disconnect_clears_credentials() {
        let fx = AppState::fake_authenticated().await;
        let req = Request::builder()
            .method(Method::POST)
            .uri("/auth/disconnect")
            .body(Body::empty())
            .unwrap();
        let res = build_app(fx.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["success"], true);
        assert!(!fx.state.credentials.is_authenticated().await);
        assert!(!fx.state.credentials.path().exists());
    }
}
