//! Credential propagation across docker, kubernetes, helm and the backend
//!
//! One username/token pair has to be known to four independent systems. Each
//! [`Registrar`] owns one of them; [`propagate`] walks them in order, clearing
//! stale state best-effort before each login and stopping at the first login
//! that fails. Steps already completed are reported, not rolled back: the UI
//! simply asks the user to save the credentials again.

mod registrars;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use thiserror::Error;

pub use registrars::{
    BackendRegistrar, DockerRegistrar, HelmRegistrar, KubernetesRegistrar, host_registrars,
};

/// Registry username and access token
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Result<Self, CredentialError> {
        let username = username.into().trim().to_string();
        let token = token.into().trim().to_string();
        if username.is_empty() || token.is_empty() {
            return Err(CredentialError::Missing);
        }
        Ok(Self { username, token })
    }

    /// Decode the base64 `user:token` form helm and docker keep in their config
    pub fn from_registry_auth(encoded: &str) -> Result<Self, CredentialError> {
        let invalid = |reason: &str| CredentialError::InvalidAuth(reason.to_string());

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| invalid("not base64"))?;
        let decoded = String::from_utf8(decoded).map_err(|_| invalid("not UTF-8"))?;
        let (username, token) = decoded
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' separator"))?;
        Self::new(username, token)
    }

    pub fn to_registry_auth(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.token))
    }
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Username and access token are required")]
    Missing,

    #[error("Invalid registry auth: {0}")]
    InvalidAuth(String),

    #[error("{message}")]
    StepFailed {
        step: &'static str,
        message: String,
        source: anyhow::Error,
    },
}

/// One system that has to learn the credentials
pub trait Registrar {
    /// Short step name used in logs and reports
    fn name(&self) -> &'static str;

    /// Drop whatever credentials the system currently holds
    fn logout(&self) -> Result<()>;

    fn login(&self, credentials: &Credentials) -> Result<()>;

    /// User-facing explanation of a failed login
    fn explain(&self, error: &anyhow::Error) -> String;
}

/// Outcome of a successful propagation
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub completed: Vec<&'static str>,
    /// Logouts that failed and were ignored, with the reason
    pub logout_warnings: Vec<(&'static str, String)>,
}

/// Log every registrar out then in, in order. Stops at the first failed login.
pub fn propagate(
    credentials: &Credentials,
    registrars: &[&dyn Registrar],
) -> Result<PropagationReport, CredentialError> {
    let mut report = PropagationReport::default();

    for registrar in registrars {
        let step = registrar.name();

        if let Err(e) = registrar.logout() {
            crate::log_warn!("Unexpected error running {} logout: {:#}", step, e);
            report.logout_warnings.push((step, format!("{:#}", e)));
        }

        if let Err(source) = registrar.login(credentials) {
            let message = registrar.explain(&source);
            crate::log_error!("Unexpected error running {} login: {:#}", step, source);
            return Err(CredentialError::StepFailed {
                step,
                message,
                source,
            });
        }

        crate::log_info!("{} login succeeded", step);
        report.completed.push(step);
    }

    Ok(report)
}

/// Best-effort logout of every registrar. Returns the failures.
pub fn revoke(registrars: &[&dyn Registrar]) -> Vec<(&'static str, String)> {
    registrars
        .iter()
        .filter_map(|registrar| match registrar.logout() {
            Ok(()) => None,
            Err(e) => {
                crate::log_warn!("Unexpected error running {} logout: {:#}", registrar.name(), e);
                Some((registrar.name(), format!("{:#}", e)))
            }
        })
        .collect()
}
