use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use std::sync::Arc;

use super::{AppState, blocking};

/// `{ "values": [...] }` on success. Any failure is logged and answered with
/// `{}`, which the UI renders as a chart without local values.
pub(super) async fn local_values(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Json<Value> {
    let result = blocking(move || state.helm.local_values(&name, &version)).await;

    match result {
        Ok(values) => Json(json!({ "values": values })),
        Err(e) => {
            crate::log_error!("Unexpected error fetching local values: {:#}", e);
            Json(json!({}))
        }
    }
}
