use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::{AppState, error_response};
use crate::store::{Notification, NotificationUpdate, StoreError};

fn store_error_response(context: &str, err: StoreError) -> Response {
    let status = match &err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
        StoreError::Io { .. } | StoreError::Corrupt { .. } => {
            crate::log_error!("{}: {}", context, err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, err.to_string())
}

async fn run_store<T, F>(state: Arc<AppState>, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&AppState) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(move || f(&state)).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Io {
            path: Default::default(),
            source: std::io::Error::other(e.to_string()),
        }),
    }
}

pub(super) async fn list(State(state): State<Arc<AppState>>) -> Response {
    match run_store(state, |s| s.store.list()).await {
        Ok(notifications) => Json(notifications).into_response(),
        Err(e) => store_error_response("Unexpected error getting user notifications", e),
    }
}

pub(super) async fn create(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<Notification>,
) -> Response {
    match run_store(state, move |s| s.store.save(notification)).await {
        Ok(stored) => Json(stored).into_response(),
        Err(e) => store_error_response("Unexpected error saving notification", e),
    }
}

pub(super) async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<NotificationUpdate>,
) -> Response {
    match run_store(state, move |s| s.store.update(&id, update)).await {
        Ok(notification) => Json(notification).into_response(),
        Err(e) => store_error_response("Unexpected error updating notification", e),
    }
}

pub(super) async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match run_store(state, move |s| s.store.delete(&id)).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => store_error_response("Unexpected error deleting notification", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::build_router;
    use super::super::tests::{body_json, test_state};
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> axum::response::Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn notification(id: &str, timestamp: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Application successfully installed",
            "description": "redis-1712 has been deployed",
            "type": "success",
            "dismissed": false,
            "timestamp": timestamp,
            "href": "/workloads",
            "actionText": "View details"
        })
    }

    #[tokio::test]
    async fn test_notification_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let resp = send(&app, Request::get("/notifications").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));

        for (id, ts) in [("a", 10), ("b", 30), ("c", 20)] {
            let resp = send(&app, json_request("POST", "/notifications", notification(id, ts))).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = send(&app, Request::get("/notifications").body(Body::empty()).unwrap()).await;
        let list = body_json(resp).await;
        let ids: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(list[0]["actionText"], "View details");

        let resp = send(&app, json_request("PUT", "/notifications/c", json!({"dismissed": true}))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = body_json(resp).await;
        assert_eq!(updated["dismissed"], true);
        assert_eq!(updated["title"], "Application successfully installed");

        let resp = send(&app, Request::delete("/notifications/a").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, Request::get("/notifications").body(Body::empty()).unwrap()).await;
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_without_id_returns_assigned_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let mut body = notification("x", 5);
        body.as_object_mut().unwrap().remove("id");
        let resp = send(&app, json_request("POST", "/notifications", body)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let created = body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());

        let resp = send(&app, Request::get("/notifications").body(Body::empty()).unwrap()).await;
        assert_eq!(body_json(resp).await[0]["id"], id.as_str());

        let uri = format!("/notifications/{}", id);
        let resp = send(&app, Request::delete(uri.as_str()).body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let resp = send(&app, json_request("POST", "/notifications", notification("a", 1))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = send(&app, json_request("POST", "/notifications", notification("a", 2))).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));

        let resp = send(&app, json_request("PUT", "/notifications/zzz", json!({"dismissed": true}))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = send(&app, Request::delete("/notifications/zzz").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_json(resp).await["error"].as_str().unwrap().contains("zzz"));
    }

    #[tokio::test]
    async fn test_corrupt_store_is_500() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data").join(".notifications.json"), "[oops").unwrap();
        let app = build_router(test_state(dir.path()));

        let resp = send(&app, Request::get("/notifications").body(Body::empty()).unwrap()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
