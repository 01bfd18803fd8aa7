//! Helm release model and status mapping

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status as reported by helm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HelmReleaseStatus {
    Deployed,
    Unknown,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
    #[serde(other)]
    Other,
}

/// Status shown for a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkloadStatus {
    NotRunning,
    Running,
    Loading,
    Error,
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WorkloadStatus::NotRunning => "NotRunning",
            WorkloadStatus::Running => "Running",
            WorkloadStatus::Loading => "Loading",
            WorkloadStatus::Error => "Error",
        };
        f.write_str(label)
    }
}

pub fn map_status(status: HelmReleaseStatus) -> WorkloadStatus {
    match status {
        HelmReleaseStatus::Superseded | HelmReleaseStatus::Deployed => WorkloadStatus::Running,
        HelmReleaseStatus::Unknown | HelmReleaseStatus::Failed => WorkloadStatus::Error,
        HelmReleaseStatus::Uninstalling
        | HelmReleaseStatus::PendingInstall
        | HelmReleaseStatus::PendingUpgrade
        | HelmReleaseStatus::PendingRollback => WorkloadStatus::Loading,
        HelmReleaseStatus::Uninstalled | HelmReleaseStatus::Other => WorkloadStatus::NotRunning,
    }
}

/// Chart version: everything after the last `-` of `<name>-<version>`
pub fn chart_version(chart: &str) -> &str {
    match chart.rfind('-') {
        Some(idx) => &chart[idx + 1..],
        None => chart,
    }
}

/// Chart name: everything before the last `-` of `<name>-<version>`
pub fn chart_name(chart: &str) -> &str {
    match chart.rfind('-') {
        Some(idx) => &chart[..idx],
        None => "",
    }
}

/// One row of `helm list -o json`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HelmListEntry {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub updated: String,
    pub status: HelmReleaseStatus,
    pub chart: String,
    #[serde(default)]
    pub app_version: String,
}

/// A release as presented to users
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub status: WorkloadStatus,
    pub chart: String,
    pub version: String,
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<HelmListEntry> for Release {
    fn from(entry: HelmListEntry) -> Self {
        Self {
            version: chart_version(&entry.chart).to_string(),
            status: map_status(entry.status),
            name: entry.name,
            namespace: entry.namespace,
            chart: entry.chart,
            app_version: entry.app_version,
            notes: None,
        }
    }
}

/// One row of `helm history -o json`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HistoryEntry {
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub updated: String,
    pub status: HelmReleaseStatus,
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub description: String,
}

impl HistoryEntry {
    /// The structured description written at install/upgrade time, if any
    pub fn parsed_description(&self) -> Option<Description> {
        serde_json::from_str(&self.description).ok()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReleaseDetails {
    #[serde(flatten)]
    pub release: Release,
    pub history: Vec<HistoryEntry>,
}

/// Release JSON printed by `helm install|upgrade -o json`
#[derive(Debug, Clone, Deserialize)]
pub struct HelmInstallOutput {
    pub name: String,
    pub namespace: String,
    pub info: HelmInstallInfo,
    #[serde(default)]
    pub chart: Option<HelmInstallChart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelmInstallInfo {
    pub status: HelmReleaseStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelmInstallChart {
    pub metadata: HelmChartMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelmChartMetadata {
    #[serde(rename = "appVersion", default)]
    pub app_version: Option<String>,
}

impl HelmInstallOutput {
    pub fn app_version(&self) -> Option<&str> {
        self.chart
            .as_ref()
            .and_then(|c| c.metadata.app_version.as_deref())
    }
}

/// Structured `--description` attached to each revision
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Description {
    pub message: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// A catalog chart artifact to install or upgrade to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    /// `<chart>` or `<chart>:<tag>`
    pub name: String,
    pub version: String,
    pub revision: Option<String>,
    pub digest: Option<String>,
}

impl ChartArtifact {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            revision: None,
            digest: None,
        }
    }

    /// Chart name without the tag suffix
    pub fn chart(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }

    /// `<chart>-<version>`, as helm reports it
    pub fn chart_label(&self) -> String {
        format!("{}-{}", self.chart(), self.version)
    }
}

/// A `--set key=value` override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueOverride {
    pub key: String,
    pub value: String,
}

impl ValueOverride {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ValueOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl FromStr for ValueOverride {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self::new(key, value)),
            _ => Err(anyhow!("Invalid value override '{}', expected key=value", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_status() {
        assert_eq!(map_status(HelmReleaseStatus::Deployed), WorkloadStatus::Running);
        assert_eq!(map_status(HelmReleaseStatus::Superseded), WorkloadStatus::Running);
        assert_eq!(map_status(HelmReleaseStatus::Failed), WorkloadStatus::Error);
        assert_eq!(map_status(HelmReleaseStatus::Unknown), WorkloadStatus::Error);
        assert_eq!(map_status(HelmReleaseStatus::PendingUpgrade), WorkloadStatus::Loading);
        assert_eq!(map_status(HelmReleaseStatus::Uninstalling), WorkloadStatus::Loading);
        assert_eq!(map_status(HelmReleaseStatus::Uninstalled), WorkloadStatus::NotRunning);
        assert_eq!(map_status(HelmReleaseStatus::Other), WorkloadStatus::NotRunning);
    }

    #[test]
    fn test_unrecognised_status_deserializes() {
        let status: HelmReleaseStatus = serde_json::from_str("\"pending-something\"").unwrap();
        assert_eq!(status, HelmReleaseStatus::Other);
        let status: HelmReleaseStatus = serde_json::from_str("\"pending-rollback\"").unwrap();
        assert_eq!(status, HelmReleaseStatus::PendingRollback);
    }

    #[test]
    fn test_chart_name_and_version() {
        assert_eq!(chart_version("redis-ha-0.1.2"), "0.1.2");
        assert_eq!(chart_name("redis-ha-0.1.2"), "redis-ha");
        assert_eq!(chart_version("plain"), "plain");
        assert_eq!(chart_name("plain"), "");
    }

    #[test]
    fn test_list_entry_into_release() {
        let json = r#"{"name":"redis-1712","namespace":"default","revision":"2","updated":"2024-04-10 10:00:00 +0000 UTC","status":"superseded","chart":"redis-0.3.1","app_version":"7.2.4"}"#;
        let entry: HelmListEntry = serde_json::from_str(json).unwrap();
        let release = Release::from(entry);
        assert_eq!(release.status, WorkloadStatus::Running);
        assert_eq!(release.version, "0.3.1");
        assert_eq!(release.app_version, "7.2.4");
    }

    #[test]
    fn test_artifact_chart() {
        let artifact = ChartArtifact::new("redis:0.3.1", "0.3.1");
        assert_eq!(artifact.chart(), "redis");
        assert_eq!(artifact.chart_label(), "redis-0.3.1");
    }

    #[test]
    fn test_value_override_parse() {
        let value: ValueOverride = "global.imagePullSecrets[0].name=a=b".parse().unwrap();
        assert_eq!(value.key, "global.imagePullSecrets[0].name");
        assert_eq!(value.value, "a=b");
        assert!("=novalue".parse::<ValueOverride>().is_err());
        assert!("nokey".parse::<ValueOverride>().is_err());
    }

    #[test]
    fn test_description_round_trip_in_history() {
        let entry = HistoryEntry {
            revision: 1,
            updated: String::new(),
            status: HelmReleaseStatus::Deployed,
            chart: "redis-0.3.1".to_string(),
            app_version: "7.2.4".to_string(),
            description: r#"{"message":"Generated by Application Collection extension","version":"0.3.1","branch":"7.2"}"#.to_string(),
        };
        let description = entry.parsed_description().unwrap();
        assert_eq!(description.branch.as_deref(), Some("7.2"));
        assert_eq!(description.revision, None);

        let plain = HistoryEntry {
            description: "Install complete".to_string(),
            ..entry
        };
        assert!(plain.parsed_description().is_none());
    }
}
