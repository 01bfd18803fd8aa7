//! The registry pull secret referenced by installed charts

use anyhow::{Context, Result};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::kubectl;
use crate::credentials::Credentials;

const DOCKER_CONFIG_JSON_TYPE: &str = "kubernetes.io/dockerconfigjson";
const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

/// docker-registry secret in the current namespace
#[derive(Debug, Clone)]
pub struct PullSecret {
    name: String,
    server: String,
    kubeconfig: Option<PathBuf>,
}

impl PullSecret {
    pub fn new(name: impl Into<String>, server: impl Into<String>, kubeconfig: Option<&Path>) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            kubeconfig: kubeconfig.map(Path::to_path_buf),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same object `kubectl create secret docker-registry` produces,
    /// built locally so the token never reaches argv
    pub fn manifest(&self, credentials: &Credentials) -> Result<Secret> {
        let config = json!({
            "auths": {
                self.server.as_str(): {
                    "username": credentials.username,
                    "password": credentials.token,
                    "auth": credentials.to_registry_auth(),
                }
            }
        });
        let config = serde_json::to_vec(&config).context("Failed to encode docker config")?;

        Ok(Secret {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                ..Default::default()
            },
            type_: Some(DOCKER_CONFIG_JSON_TYPE.to_string()),
            data: Some(BTreeMap::from([(
                DOCKER_CONFIG_JSON_KEY.to_string(),
                ByteString(config),
            )])),
            ..Default::default()
        })
    }

    pub fn create(&self, credentials: &Credentials) -> Result<()> {
        crate::log_info!("Creating kubernetes secret {}", self.name);
        let manifest = serde_json::to_string(&self.manifest(credentials)?)
            .context("Failed to serialize secret")?;
        kubectl::create_manifest(&manifest, self.kubeconfig.as_deref())
            .with_context(|| format!("Failed to create secret {}", self.name))
    }

    pub fn delete(&self) -> Result<()> {
        crate::log_info!("Deleting kubernetes secret {}", self.name);
        kubectl::run_kubectl(
            &["delete", "secret", &self.name, "--wait"],
            self.kubeconfig.as_deref(),
        )
    }

    /// True only when kubectl returns a secret carrying exactly this name.
    /// Any lookup failure counts as absent.
    pub fn exists(&self) -> bool {
        let output = kubectl::run_kubectl_output(
            &["get", "secret", &self.name, "-o", "json"],
            self.kubeconfig.as_deref(),
        );

        match output {
            Ok(json) => secret_matches(&json, &self.name),
            Err(e) => {
                crate::log_warn!("Could not check secret {}: {:#}", self.name, e);
                false
            }
        }
    }
}

fn secret_matches(json: &str, name: &str) -> bool {
    serde_json::from_str::<Secret>(json)
        .map(|secret| secret.metadata.name.as_deref() == Some(name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_manifest_shape() {
        let secret = PullSecret::new("application-collection", "dp.apps.rancher.io", None);
        let credentials = Credentials::new("me@example.com", "tok3n").unwrap();
        let manifest = secret.manifest(&credentials).unwrap();
        let value = serde_json::to_value(&manifest).unwrap();

        assert_eq!(value["kind"], "Secret");
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(value["metadata"]["name"], "application-collection");
        assert_eq!(value["type"], "kubernetes.io/dockerconfigjson");

        let encoded = value["data"][".dockerconfigjson"].as_str().unwrap();
        let decoded: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
        let entry = &decoded["auths"]["dp.apps.rancher.io"];
        assert_eq!(entry["username"], "me@example.com");
        assert_eq!(entry["password"], "tok3n");
        assert_eq!(
            entry["auth"],
            STANDARD.encode("me@example.com:tok3n").as_str()
        );
    }

    #[test]
    fn test_secret_matches() {
        let json = r#"{"apiVersion":"v1","kind":"Secret","metadata":{"name":"application-collection"}}"#;
        assert!(secret_matches(json, "application-collection"));
        assert!(!secret_matches(json, "other"));
        assert!(!secret_matches("not json", "application-collection"));
    }
}
