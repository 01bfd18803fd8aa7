//! Configuration file support for appco

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub registry: RegistrySettings,

    #[serde(default)]
    pub helm: HelmSettings,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub kubernetes: KubernetesSettings,
}

/// Application Collection registry coordinates
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RegistrySettings {
    #[serde(default = "default_registry_host")]
    pub host: String,

    #[serde(default = "default_charts_path")]
    pub charts_path: String,

    #[serde(default = "default_containers_path")]
    pub containers_path: String,

    /// Name of the docker-registry secret referenced as imagePullSecrets
    #[serde(default = "default_pull_secret")]
    pub pull_secret: String,
}

/// Helm behaviour
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HelmSettings {
    /// Label put on every release installed through the extension
    #[serde(default = "default_release_label")]
    pub release_label: String,

    /// Override for helm's registry config.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_config: Option<String>,

    /// helm executable, a name looked up on PATH or a full path
    #[serde(default = "default_helm_binary")]
    pub binary: String,
}

/// Backend service settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BackendSettings {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Unix socket path. When set, the service binds here instead of `listen`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,

    /// Where CLI commands reach the service
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Kubernetes target
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KubernetesSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,

    #[serde(default = "default_namespace")]
    pub namespace: String,
}

// Default value functions
fn default_registry_host() -> String {
    "dp.apps.rancher.io".to_string()
}

fn default_charts_path() -> String {
    "charts".to_string()
}

fn default_containers_path() -> String {
    "containers".to_string()
}

fn default_pull_secret() -> String {
    "application-collection".to_string()
}

fn default_release_label() -> String {
    "source=application-collection-extension".to_string()
}

fn default_helm_binary() -> String {
    "helm".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:7171".to_string()
}

fn default_backend_url() -> String {
    "http://127.0.0.1:7171".to_string()
}

fn default_data_dir() -> String {
    "/root/data".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            host: default_registry_host(),
            charts_path: default_charts_path(),
            containers_path: default_containers_path(),
            pull_secret: default_pull_secret(),
        }
    }
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            release_label: default_release_label(),
            registry_config: None,
            binary: default_helm_binary(),
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            socket: None,
            url: default_backend_url(),
            data_dir: default_data_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for KubernetesSettings {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            namespace: default_namespace(),
        }
    }
}

impl RegistrySettings {
    /// `<host>/<charts_path>`, the helm OCI repository
    pub fn charts_repository(&self) -> String {
        format!("{}/{}", self.host, self.charts_path)
    }

    /// `<host>/<containers_path>`, the docker login target
    pub fn containers_repository(&self) -> String {
        format!("{}/{}", self.host, self.containers_path)
    }

    /// OCI reference for a chart, e.g. `oci://dp.apps.rancher.io/charts/redis`
    pub fn chart_reference(&self, chart: &str) -> String {
        format!("oci://{}/{}", self.charts_repository(), chart)
    }
}

impl HelmSettings {
    /// Resolve helm's registry config.json.
    /// Priority: config override > HELM_REGISTRY_CONFIG > <config_dir>/helm/registry/config.json
    pub fn registry_config_path(&self) -> PathBuf {
        if let Some(path) = &self.registry_config {
            return PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("HELM_REGISTRY_CONFIG") {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/root/.config"))
            .join("helm")
            .join("registry")
            .join("config.json")
    }
}

impl BackendSettings {
    /// Flat file holding the notifications list
    pub fn notifications_file(&self) -> PathBuf {
        Path::new(&self.data_dir).join(".notifications.json")
    }
}

impl KubernetesSettings {
    pub fn kubeconfig_path(&self) -> Option<PathBuf> {
        self.kubeconfig.as_ref().map(PathBuf::from)
    }
}

impl Settings {
    /// Load settings from file or return defaults
    pub fn load() -> Self {
        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path).unwrap_or_else(|e| {
                crate::log_warn!("{:#}; using default settings", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .appco.toml in current directory
    /// 2. ~/.config/appco/config.toml (XDG config directory)
    pub fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(".appco.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("appco").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    /// Default location for `appco config init`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("appco").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".appco.toml"))
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Generate example config file content
    pub fn example_config() -> Result<String> {
        let header = "# appco configuration file\n\
                      # Place this file at ~/.config/appco/config.toml or .appco.toml in your project\n\n";
        let body = toml::to_string_pretty(&Settings::default())
            .context("Failed to serialize default settings")?;
        Ok(format!("{}{}", header, body))
    }
}
