//! Blocking client for the extension backend service

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::settings::BackendSettings;
use crate::helm::LocalValue;
use crate::store::{Notification, NotificationUpdate};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Timeout connecting to extension backend at {url}")]
    Timeout { url: String },

    #[error("Extension backend at {url} is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Extension backend answered {status} for {url}")]
    Status { url: String, status: StatusCode },
}

impl BackendError {
    fn from_transport(url: &Url, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            BackendError::Timeout {
                url: url.to_string(),
            }
        } else {
            BackendError::Unreachable {
                url: url.to_string(),
                source,
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout { .. })
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(serde::Deserialize)]
struct LocalValuesResponse {
    #[serde(default)]
    values: Vec<LocalValue>,
}

/// HTTP client for the routes served by `appco serve`
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    http: Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid backend url: {}", base_url))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("Invalid backend url: {}", base_url));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base, http })
    }

    pub fn from_settings(settings: &BackendSettings) -> Result<Self> {
        Self::new(&settings.url, Duration::from_secs(settings.timeout_secs))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn send(&self, url: &Url, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .map_err(|e| BackendError::from_transport(url, e))?;
        if !response.status().is_success() {
            return Err(BackendError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response)
    }

    pub fn health(&self) -> Result<(), BackendError> {
        let url = self.endpoint(&["health"]);
        self.send(&url, self.http.get(url.clone()))?;
        Ok(())
    }

    /// Have the backend run `helm registry login`
    pub fn login(&self, username: &str, password: &str) -> Result<(), BackendError> {
        let url = self.endpoint(&["user", "login"]);
        let body = LoginRequest { username, password };
        self.send(&url, self.http.post(url.clone()).json(&body))?;
        Ok(())
    }

    pub fn logout(&self) -> Result<(), BackendError> {
        let url = self.endpoint(&["user", "logout"]);
        self.send(&url, self.http.post(url.clone()).json(&serde_json::json!({})))?;
        Ok(())
    }

    /// Registry auth stored in the backend, None when it answers 404
    pub fn auth(&self) -> Result<Option<String>> {
        let url = self.endpoint(&["user", "auth"]);
        match self.send(&url, self.http.get(url.clone())) {
            Ok(response) => Ok(Some(response.json().context("Invalid auth response")?)),
            Err(BackendError::Status { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn notifications(&self) -> Result<Vec<Notification>> {
        let url = self.endpoint(&["notifications"]);
        let response = self.send(&url, self.http.get(url.clone()))?;
        response.json().context("Invalid notifications response")
    }

    /// Returns the stored notification, carrying the id the backend kept
    pub fn add_notification(&self, notification: &Notification) -> Result<Notification> {
        let url = self.endpoint(&["notifications"]);
        let response = self.send(&url, self.http.post(url.clone()).json(notification))?;
        response.json().context("Invalid notification response")
    }

    pub fn update_notification(&self, id: &str, update: &NotificationUpdate) -> Result<()> {
        let url = self.endpoint(&["notifications", id]);
        self.send(&url, self.http.put(url.clone()).json(update))?;
        Ok(())
    }

    pub fn delete_notification(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["notifications", id]);
        self.send(&url, self.http.delete(url.clone()))?;
        Ok(())
    }

    pub fn local_values(&self, chart: &str, version: &str) -> Result<Vec<LocalValue>> {
        let url = self.endpoint(&["charts", chart, version, "local-values"]);
        let response = self.send(&url, self.http.get(url.clone()))?;
        let body: LocalValuesResponse = response.json().context("Invalid local values response")?;
        Ok(body.values)
    }
}
