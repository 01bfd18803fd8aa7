//! Backend HTTP service the extension UI talks to

mod chart_routes;
mod notification_routes;
mod user_routes;

use anyhow::{Context, Result, anyhow, bail};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::helm::HelmCli;
use crate::store::NotificationStore;

/// Shared state behind every route
pub struct AppState {
    pub settings: Settings,
    pub helm: HelmCli,
    pub store: NotificationStore,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let kubeconfig = settings.kubernetes.kubeconfig_path();
        let helm = HelmCli::new(&settings, kubeconfig.as_deref());
        let store = NotificationStore::new(settings.backend.notifications_file());
        Self {
            settings,
            helm,
            store,
        }
    }
}

/// Where the service listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bind {
    Tcp(String),
    Unix(PathBuf),
}

impl Bind {
    /// A configured socket wins over the TCP address
    pub fn from_settings(settings: &Settings) -> Self {
        match &settings.backend.socket {
            Some(path) => Bind::Unix(PathBuf::from(path)),
            None => Bind::Tcp(settings.backend.listen.clone()),
        }
    }
}

/// JSON error body used by every route
fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Run CLI or filesystem work off the async workers
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow!("Blocking task failed: {}", e))?
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Build the router (exposed for testing)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        // User session
        .route("/user/auth", get(user_routes::auth))
        .route("/user/login", post(user_routes::login))
        .route("/user/logout", post(user_routes::logout))
        // Notifications
        .route(
            "/notifications",
            get(notification_routes::list).post(notification_routes::create),
        )
        .route(
            "/notifications/{id}",
            put(notification_routes::update).delete(notification_routes::delete),
        )
        // Charts
        .route(
            "/charts/{name}/{version}/local-values",
            get(chart_routes::local_values),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        crate::log_error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    crate::log_info!("Shutting down backend");
}

/// Serve until Ctrl-C
pub async fn serve(state: Arc<AppState>, bind: Bind) -> Result<()> {
    let app = build_router(state);

    match bind {
        Bind::Tcp(addr) => {
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            let local = listener
                .local_addr()
                .context("Failed to read listener address")?;
            crate::log_info!("Backend listening on http://{}", local);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Backend server error")
        }
        Bind::Unix(path) => serve_unix(app, path).await,
    }
}

#[cfg(unix)]
async fn serve_unix(app: Router, path: PathBuf) -> Result<()> {
    use std::os::unix::fs::FileTypeExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    // A socket left behind by a previous run blocks bind; anything else is not ours
    if let Ok(meta) = std::fs::symlink_metadata(&path) {
        if !meta.file_type().is_socket() {
            bail!("{} exists and is not a socket", path.display());
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove stale socket {}", path.display()))?;
    }

    let listener = tokio::net::UnixListener::bind(&path)
        .with_context(|| format!("Failed to bind {}", path.display()))?;
    crate::log_info!("Backend listening on unix:{}", path.display());

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Backend server error");

    let _ = std::fs::remove_file(&path);
    result
}

#[cfg(not(unix))]
async fn serve_unix(_app: Router, path: PathBuf) -> Result<()> {
    Err(anyhow!(
        "Unix sockets are not supported on this platform: {}",
        path.display()
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::path::Path;
    use tower::ServiceExt;

    fn settings_in(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.backend.data_dir = dir.join("data").to_string_lossy().into_owned();
        settings.helm.registry_config =
            Some(dir.join("registry.json").to_string_lossy().into_owned());
        settings
    }

    /// State rooted in a temp dir: notifications file and helm registry config
    pub(crate) fn test_state(dir: &Path) -> Arc<AppState> {
        Arc::new(AppState::new(settings_in(dir)))
    }

    /// Same as `test_state`, with helm replaced by a shell script running `body`
    pub(crate) fn test_state_with_helm(dir: &Path, body: &str) -> Arc<AppState> {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("helm");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut settings = settings_in(dir);
        settings.helm.binary = script.to_string_lossy().into_owned();
        Arc::new(AppState::new(settings))
    }

    pub(crate) async fn body_json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["ok"], true);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()));
        let resp = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bind_from_settings() {
        let mut settings = Settings::default();
        assert_eq!(
            Bind::from_settings(&settings),
            Bind::Tcp("127.0.0.1:7171".to_string())
        );
        settings.backend.socket = Some("/run/guest-services/backend.sock".to_string());
        assert_eq!(
            Bind::from_settings(&settings),
            Bind::Unix(PathBuf::from("/run/guest-services/backend.sock"))
        );
    }

    #[tokio::test]
    async fn test_serve_on_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("backend.sock");
        let state = test_state(dir.path());

        let server = tokio::spawn(serve(state, Bind::Unix(socket.clone())));
        for _ in 0..50 {
            if socket.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(socket.exists());
        server.abort();
    }

    #[tokio::test]
    async fn test_serve_refuses_to_replace_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backend.sock");
        std::fs::write(&path, "keep me").unwrap();

        let err = serve(test_state(dir.path()), Bind::Unix(path.clone()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a socket"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }
}
