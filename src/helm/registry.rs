//! Helm OCI registry credentials

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RegistryConfig {
    #[serde(default)]
    auths: HashMap<String, RegistryAuthEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryAuthEntry {
    #[serde(default)]
    auth: Option<String>,
}

/// Base64 `user:token` stored by `helm registry login` for `host`.
/// A missing config file means nobody logged in yet.
pub fn registry_auth(config_path: &Path, host: &str) -> Result<Option<String>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let raw = std::fs::read_to_string(config_path).with_context(|| {
        format!(
            "Failed to read helm registry config: {}",
            config_path.display()
        )
    })?;

    let config: RegistryConfig = serde_json::from_str(&raw).with_context(|| {
        format!(
            "Failed to parse helm registry config: {}",
            config_path.display()
        )
    })?;

    Ok(config
        .auths
        .get(host)
        .and_then(|entry| entry.auth.clone())
        .filter(|auth| !auth.is_empty()))
}
