//! Helm CLI wrapper

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::path::{Path, PathBuf};

use super::registry;
use super::release::{
    ChartArtifact, Description, HelmInstallOutput, HelmListEntry, HistoryEntry, Release,
    ReleaseDetails, ValueOverride, chart_name, map_status,
};
use super::values::{self, LOCAL_VALUES_FILE, LocalValue};
use crate::config::Settings;
use crate::config::settings::RegistrySettings;
use crate::k8s::PullSecret;
use crate::utils::dryrun;
use crate::utils::{AppcoError, CommandError, HostCommand};

const INSTALL_MESSAGE: &str = "Generated by Application Collection extension";

/// Helm operations scoped to the Application Collection registry
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: String,
    registry: RegistrySettings,
    release_label: String,
    registry_config: PathBuf,
    kubeconfig: Option<PathBuf>,
}

impl HelmCli {
    pub fn new(settings: &Settings, kubeconfig: Option<&Path>) -> Self {
        Self {
            binary: settings.helm.binary.clone(),
            registry: settings.registry.clone(),
            release_label: settings.helm.release_label.clone(),
            registry_config: settings.helm.registry_config_path(),
            kubeconfig: kubeconfig.map(Path::to_path_buf),
        }
    }

    fn helm(&self) -> HostCommand {
        HostCommand::new(&self.binary).kubeconfig(self.kubeconfig.as_deref())
    }

    fn pull_secret(&self) -> PullSecret {
        PullSecret::new(
            &self.registry.pull_secret,
            &self.registry.host,
            self.kubeconfig.as_deref(),
        )
    }

    /// `helm version`; the extension cannot work without helm on the host
    pub fn check(&self) -> Result<()> {
        self.helm()
            .arg("version")
            .output()
            .map_err(|e| anyhow!("helm required on host machine: {}", e))?;
        Ok(())
    }

    // Registry

    /// Stored registry auth for the configured host
    pub fn registry_auth(&self) -> Result<Option<String>> {
        registry::registry_auth(&self.registry_config, &self.registry.host)
    }

    /// `helm registry login <host> -u <user> --password-stdin`
    pub fn registry_login(&self, username: &str, token: &str) -> Result<(), CommandError> {
        crate::log_info!("Logging helm into {}", self.registry.host);
        self.helm()
            .args(["registry", "login", &self.registry.host])
            .args(["-u", username, "--password-stdin"])
            .stdin(token)
            .run_mutating()?;
        Ok(())
    }

    /// `helm registry logout <host>`
    pub fn registry_logout(&self) -> Result<(), CommandError> {
        crate::log_info!("Logging helm out of {}", self.registry.host);
        self.helm()
            .args(["registry", "logout", &self.registry.host])
            .run_mutating()?;
        Ok(())
    }

    // Releases

    fn list(&self, label: Option<&str>) -> Result<Vec<HelmListEntry>> {
        let mut cmd = self.helm().args(["list", "-a", "-A", "-o", "json"]);
        if let Some(label) = label {
            cmd = cmd.args(["-l", label]);
        }
        let output = cmd.output().context("Unexpected error listing helm releases")?;
        parse_json(&output.stdout, "helm list")
    }

    /// Releases installed through the extension
    pub fn list_releases(&self) -> Result<Vec<Release>> {
        self.check()?;
        Ok(self
            .list(Some(&self.release_label))?
            .into_iter()
            .map(Release::from)
            .collect())
    }

    pub fn history(&self, name: &str, namespace: &str) -> Result<Vec<HistoryEntry>> {
        let output = self
            .helm()
            .args(["history", "-o", "json", "-n", namespace, name])
            .output()
            .with_context(|| format!("Couldn't read workload history for {}", name))?;
        parse_json(&output.stdout, "helm history")
    }

    pub fn notes(&self, name: &str, namespace: &str) -> Result<String> {
        let output = self
            .helm()
            .args(["get", "notes", "-n", namespace, name])
            .output()
            .with_context(|| format!("Couldn't read workload notes for {}", name))?;
        Ok(output.stdout)
    }

    /// First labelled release of `component` whose latest revision's
    /// app version matches `branch_pattern`
    pub fn find_release_for_component(
        &self,
        component: &str,
        branch_pattern: &Regex,
    ) -> Result<Option<Release>> {
        self.check()?;
        for entry in self.list(Some(&self.release_label))? {
            if !entry.chart.starts_with(component) {
                continue;
            }
            let history = self.history(&entry.name, &entry.namespace)?;
            if latest_matches(&history, branch_pattern) {
                return Ok(Some(Release::from(entry)));
            }
        }
        Ok(None)
    }

    /// Any release by name, labelled or not, with notes and history
    pub fn release_details(&self, name: &str) -> Result<ReleaseDetails> {
        let entry = self
            .list(None)?
            .into_iter()
            .find(|entry| entry.name == name)
            .ok_or_else(|| AppcoError::release_not_found(name))?;

        let notes = self.notes(&entry.name, &entry.namespace)?;
        let history = self.history(&entry.name, &entry.namespace)?;

        let mut release = Release::from(entry);
        release.notes = Some(notes);
        Ok(ReleaseDetails { release, history })
    }

    fn ensure_pull_secret(&self) -> Result<()> {
        if self.pull_secret().exists() {
            Ok(())
        } else {
            Err(AppcoError::pull_secret_missing(&self.registry.pull_secret).into())
        }
    }

    pub fn install_args(
        &self,
        artifact: &ChartArtifact,
        branch: Option<&str>,
        values: &[ValueOverride],
    ) -> Result<Vec<String>> {
        let description = Description {
            message: INSTALL_MESSAGE.to_string(),
            version: artifact.version.clone(),
            revision: artifact.revision.clone(),
            digest: artifact.digest.clone(),
            branch: branch.map(str::to_string),
        };

        let mut args = vec![
            "install".to_string(),
            self.registry.chart_reference(artifact.chart()),
            "--version".to_string(),
            artifact.version.clone(),
        ];
        args.extend(self.set_args(values));
        args.extend([
            "--description".to_string(),
            serde_json::to_string(&description).context("Failed to encode description")?,
            "--generate-name".to_string(),
            "-l".to_string(),
            self.release_label.clone(),
            "-o".to_string(),
            "json".to_string(),
        ]);
        Ok(args)
    }

    pub fn upgrade_args(
        &self,
        release: &Release,
        values: &[ValueOverride],
        artifact: Option<&ChartArtifact>,
    ) -> Result<Vec<String>> {
        let (description, repository) = match artifact {
            Some(artifact) => (
                Description {
                    message: format!("Upgrade from {} to {}", release.version, artifact.version),
                    version: artifact.version.clone(),
                    revision: artifact.revision.clone(),
                    digest: artifact.digest.clone(),
                    branch: None,
                },
                self.registry.chart_reference(artifact.chart()),
            ),
            None => (
                Description {
                    message: format!("Edit version {} values", release.version),
                    version: release.version.clone(),
                    revision: None,
                    digest: None,
                    branch: None,
                },
                self.registry.chart_reference(chart_name(&release.chart)),
            ),
        };

        let mut args = vec![
            "upgrade".to_string(),
            release.name.clone(),
            repository,
            "-n".to_string(),
            release.namespace.clone(),
        ];
        args.extend(self.set_args(values));
        args.extend([
            "--description".to_string(),
            serde_json::to_string(&description).context("Failed to encode description")?,
            "-o".to_string(),
            "json".to_string(),
        ]);
        if let Some(artifact) = artifact {
            args.extend(["--version".to_string(), artifact.version.clone()]);
        }
        Ok(args)
    }

    /// Pull secret first, caller overrides after so they can win
    fn set_args(&self, values: &[ValueOverride]) -> Vec<String> {
        let pull_secret = ValueOverride::new(
            "global.imagePullSecrets[0].name",
            self.registry.pull_secret.clone(),
        );
        std::iter::once(&pull_secret)
            .chain(values.iter().filter(|v| **v != pull_secret))
            .flat_map(|v| ["--set".to_string(), v.to_string()])
            .collect()
    }

    /// Run a release-changing helm command; under --dry-run helm simulates it
    fn run_release_command(&self, args: Vec<String>) -> Result<HelmInstallOutput> {
        let mut cmd = self.helm().args(args);
        if dryrun::is_dry_run() {
            dryrun::log_action(&cmd.display());
            cmd = cmd.arg("--dry-run");
        }
        let output = cmd.output()?;
        parse_json(&output.stdout, "helm release output")
    }

    pub fn install(
        &self,
        artifact: &ChartArtifact,
        branch: Option<&str>,
        values: &[ValueOverride],
    ) -> Result<Release> {
        self.ensure_pull_secret()?;
        crate::log_info!("Installing {} {}", artifact.chart(), artifact.version);

        let installed = self
            .run_release_command(self.install_args(artifact, branch, values)?)
            .with_context(|| format!("Unexpected error installing {}", artifact.chart()))?;

        Ok(Release {
            status: map_status(installed.info.status),
            app_version: installed
                .app_version()
                .unwrap_or(&artifact.version)
                .to_string(),
            chart: artifact.chart_label(),
            version: artifact.version.clone(),
            notes: installed.info.notes,
            name: installed.name,
            namespace: installed.namespace,
        })
    }

    pub fn upgrade(
        &self,
        release: &Release,
        values: &[ValueOverride],
        artifact: Option<&ChartArtifact>,
    ) -> Result<Release> {
        self.ensure_pull_secret()?;
        crate::log_info!("Upgrading release {}", release.name);

        let upgraded = self
            .run_release_command(self.upgrade_args(release, values, artifact)?)
            .with_context(|| format!("Unexpected error upgrading release {}", release.name))?;

        Ok(Release {
            status: map_status(upgraded.info.status),
            app_version: upgraded
                .app_version()
                .unwrap_or(&release.app_version)
                .to_string(),
            chart: artifact
                .map(ChartArtifact::chart_label)
                .unwrap_or_else(|| release.chart.clone()),
            version: artifact
                .map(|a| a.version.clone())
                .unwrap_or_else(|| release.version.clone()),
            notes: upgraded.info.notes,
            name: upgraded.name,
            namespace: upgraded.namespace,
        })
    }

    /// Re-apply the current chart version with new values
    pub fn edit(&self, release: &Release, values: &[ValueOverride]) -> Result<Release> {
        self.upgrade(release, values, None)
    }

    pub fn uninstall(&self, name: &str, namespace: &str) -> Result<()> {
        crate::log_info!("Uninstalling release {} from {}", name, namespace);
        let mut cmd = self
            .helm()
            .args(["uninstall", name, "-n", namespace, "--wait"]);
        if dryrun::is_dry_run() {
            dryrun::log_action(&cmd.display());
            cmd = cmd.arg("--dry-run");
        }
        cmd.output().with_context(|| {
            format!(
                "Unexpected exception uninstalling release [name={}, namespace={}]",
                name, namespace
            )
        })?;
        Ok(())
    }

    // Charts

    /// Pull and untar a chart into `dest`
    pub fn pull_chart(&self, name: &str, version: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy().into_owned();
        self.helm()
            .args(["pull", &self.registry.chart_reference(name)])
            .args(["--version", version, "--untar", "--untardir", &dest])
            .output()
            .with_context(|| format!("Failed to pull chart {} {}", name, version))?;
        Ok(())
    }

    /// Flattened `values.local.yaml` of a chart version; empty when the chart has none.
    /// The scratch directory is removed on every path.
    pub fn local_values(&self, name: &str, version: &str) -> Result<Vec<LocalValue>> {
        validate_chart_name(name)?;

        let scratch = tempfile::Builder::new()
            .prefix("application-collection")
            .tempdir()
            .context("Failed to create temp directory")?;

        self.pull_chart(name, version, scratch.path())?;
        read_local_values(&scratch.path().join(name))
    }
}

/// Flatten `<chart_dir>/values.local.yaml` if present
pub fn read_local_values(chart_dir: &Path) -> Result<Vec<LocalValue>> {
    let file = chart_dir.join(LOCAL_VALUES_FILE);
    if !file.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    values::flatten_yaml(&text).with_context(|| format!("Failed to parse {}", file.display()))
}

/// Chart names become path components of the scratch directory
pub fn validate_chart_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(anyhow!("Invalid chart name: {:?}", name));
    }
    Ok(())
}

fn latest_matches(history: &[HistoryEntry], branch_pattern: &Regex) -> bool {
    history
        .last()
        .is_some_and(|latest| branch_pattern.is_match(&latest.app_version))
}

fn parse_json<T: serde::de::DeserializeOwned>(stdout: &str, what: &str) -> Result<T> {
    serde_json::from_str(stdout.trim()).with_context(|| format!("Failed to parse {} JSON", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helm::release::{HelmReleaseStatus, WorkloadStatus};

    fn cli() -> HelmCli {
        HelmCli::new(&Settings::default(), None)
    }

    fn release() -> Release {
        Release {
            name: "redis-1712".to_string(),
            namespace: "apps".to_string(),
            status: WorkloadStatus::Running,
            chart: "redis-ha-0.3.1".to_string(),
            version: "0.3.1".to_string(),
            app_version: "7.2.4".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_install_args() {
        let mut artifact = ChartArtifact::new("redis:0.3.1", "0.3.1");
        artifact.digest = Some("sha256:abc".to_string());
        let args = cli()
            .install_args(&artifact, Some("7.2"), &[ValueOverride::new("auth.enabled", "false")])
            .unwrap();

        assert_eq!(&args[..4], &["install", "oci://dp.apps.rancher.io/charts/redis", "--version", "0.3.1"]);
        assert_eq!(
            &args[4..8],
            &[
                "--set",
                "global.imagePullSecrets[0].name=application-collection",
                "--set",
                "auth.enabled=false"
            ]
        );
        assert_eq!(args[8], "--description");
        let description: Description = serde_json::from_str(&args[9]).unwrap();
        assert_eq!(description.message, "Generated by Application Collection extension");
        assert_eq!(description.branch.as_deref(), Some("7.2"));
        assert_eq!(description.digest.as_deref(), Some("sha256:abc"));
        assert_eq!(
            &args[10..],
            &["--generate-name", "-l", "source=application-collection-extension", "-o", "json"]
        );
    }

    #[test]
    fn test_pull_secret_override_not_duplicated() {
        let artifact = ChartArtifact::new("redis", "0.3.1");
        let values = [ValueOverride::new(
            "global.imagePullSecrets[0].name",
            "application-collection",
        )];
        let args = cli().install_args(&artifact, None, &values).unwrap();
        assert_eq!(args.iter().filter(|a| *a == "--set").count(), 1);
    }

    #[test]
    fn test_edit_args_use_release_chart() {
        let args = cli().upgrade_args(&release(), &[], None).unwrap();
        assert_eq!(
            &args[..5],
            &["upgrade", "redis-1712", "oci://dp.apps.rancher.io/charts/redis-ha", "-n", "apps"]
        );
        assert!(!args.contains(&"--version".to_string()));
        let idx = args.iter().position(|a| a == "--description").unwrap();
        let description: Description = serde_json::from_str(&args[idx + 1]).unwrap();
        assert_eq!(description.message, "Edit version 0.3.1 values");
    }

    #[test]
    fn test_upgrade_args_with_artifact() {
        let artifact = ChartArtifact::new("redis-ha:0.4.0", "0.4.0");
        let args = cli().upgrade_args(&release(), &[], Some(&artifact)).unwrap();
        assert_eq!(args[2], "oci://dp.apps.rancher.io/charts/redis-ha");
        assert_eq!(&args[args.len() - 2..], &["--version", "0.4.0"]);
        let idx = args.iter().position(|a| a == "--description").unwrap();
        let description: Description = serde_json::from_str(&args[idx + 1]).unwrap();
        assert_eq!(description.message, "Upgrade from 0.3.1 to 0.4.0");
        assert_eq!(description.version, "0.4.0");
    }

    #[test]
    fn test_latest_matches() {
        let entry = |app_version: &str| HistoryEntry {
            revision: 1,
            updated: String::new(),
            status: HelmReleaseStatus::Superseded,
            chart: String::new(),
            app_version: app_version.to_string(),
            description: String::new(),
        };
        let pattern = Regex::new(r"^7\.2").unwrap();
        assert!(latest_matches(&[entry("6.0.1"), entry("7.2.4")], &pattern));
        assert!(!latest_matches(&[entry("7.2.4"), entry("7.4.0")], &pattern));
        assert!(!latest_matches(&[], &pattern));
    }

    #[test]
    fn test_parse_install_output() {
        let json = r#"{"name":"redis-1712","namespace":"default","info":{"status":"deployed","notes":"Enjoy"},"chart":{"metadata":{"appVersion":"7.2.4"}}}"#;
        let output: HelmInstallOutput = parse_json(json, "test").unwrap();
        assert_eq!(output.app_version(), Some("7.2.4"));
        assert_eq!(map_status(output.info.status), WorkloadStatus::Running);
    }

    #[test]
    fn test_read_local_values() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_local_values(dir.path()).unwrap().is_empty());

        std::fs::write(dir.path().join(LOCAL_VALUES_FILE), "service:\n  type: NodePort\n").unwrap();
        let values = read_local_values(dir.path()).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].key, "service.type");
    }

    #[test]
    fn test_validate_chart_name() {
        assert!(validate_chart_name("redis").is_ok());
        assert!(validate_chart_name("").is_err());
        assert!(validate_chart_name("../etc").is_err());
        assert!(validate_chart_name("a/b").is_err());
    }
}
