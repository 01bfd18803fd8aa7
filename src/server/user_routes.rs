use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

use super::{AppState, blocking, error_response};

#[derive(Deserialize)]
pub(super) struct LoginRequest {
    username: String,
    password: String,
}

/// Stored helm registry auth as a JSON string, 404 when nobody logged in
pub(super) async fn auth(State(state): State<Arc<AppState>>) -> Response {
    match blocking(move || state.helm.registry_auth()).await {
        Ok(Some(auth)) => Json(auth).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            crate::log_error!("Unexpected error getting user auth: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error getting user auth")
        }
    }
}

pub(super) async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "username and password are required");
    }

    let result = blocking(move || {
        state
            .helm
            .registry_login(req.username.trim(), &req.password)
            .map_err(Into::into)
    })
    .await;

    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            crate::log_error!("Unexpected error login user: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error login user")
        }
    }
}

pub(super) async fn logout(State(state): State<Arc<AppState>>) -> Response {
    match blocking(move || state.helm.registry_logout().map_err(Into::into)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            crate::log_error!("Unexpected error logout user: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error logout user")
        }
    }
}
