//! `appco releases`: workloads installed from the Application Collection

use anyhow::{Context as _, Result};
use colored::{ColoredString, Colorize};
use regex::Regex;

use super::Context;
use crate::helm::{ChartArtifact, Release, ReleaseDetails, ValueOverride, WorkloadStatus};
use crate::helm::release::chart_name;
use crate::k8s::services;
use crate::store::NotificationKind;
use crate::utils::progress::with_spinner;
use crate::utils::prompt;

fn colored_status(status: WorkloadStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        WorkloadStatus::Running => label.green(),
        WorkloadStatus::Loading => label.yellow(),
        WorkloadStatus::Error => label.red(),
        WorkloadStatus::NotRunning => label.dimmed(),
    }
}

fn release_row(release: &Release) -> String {
    format!(
        "{:<32} {:<16} {:<36} {:<12} {}",
        release.name, release.namespace, release.chart, release.app_version, release.status
    )
}

pub fn list(ctx: &Context) -> Result<()> {
    let releases = ctx.helm().list_releases()?;
    if releases.is_empty() {
        println!("No workloads installed from the Application Collection");
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<32} {:<16} {:<36} {:<12} {}",
            "NAME", "NAMESPACE", "CHART", "APP VERSION", "STATUS"
        )
        .bold()
    );
    for release in &releases {
        println!(
            "{:<32} {:<16} {:<36} {:<12} {}",
            release.name,
            release.namespace,
            release.chart,
            release.app_version,
            colored_status(release.status)
        );
    }
    Ok(())
}

/// Selector matching the services helm labels for a release
fn instance_selector(release: &str) -> Vec<(String, String)> {
    vec![(
        "app.kubernetes.io/instance".to_string(),
        release.to_string(),
    )]
}

fn print_details(details: &ReleaseDetails) {
    let release = &details.release;
    println!("{} {}", "Name:".bold(), release.name);
    println!("{} {}", "Namespace:".bold(), release.namespace);
    println!("{} {}", "Chart:".bold(), release.chart);
    println!("{} {}", "Version:".bold(), release.version);
    println!("{} {}", "App version:".bold(), release.app_version);
    println!("{} {}", "Status:".bold(), colored_status(release.status));

    if !details.history.is_empty() {
        println!();
        println!("{}", "History:".bold());
        for entry in &details.history {
            let message = entry
                .parsed_description()
                .map(|d| d.message)
                .unwrap_or_else(|| entry.description.clone());
            println!(
                "  {:>3}  {:<28} {:<12} {}",
                entry.revision, entry.updated, entry.app_version, message
            );
        }
    }

    if let Some(notes) = release.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        println!();
        println!("{}", "Notes:".bold());
        println!("{}", notes.trim_end());
    }
}

pub fn show(ctx: &Context, name: &str, json: bool) -> Result<()> {
    let details = ctx.helm().release_details(name)?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&details).context("Failed to encode release")?
        );
        return Ok(());
    }

    print_details(&details);

    match services::get_services(&instance_selector(name), ctx.kubeconfig()) {
        Ok(found) if !found.is_empty() => {
            println!();
            println!("{}", "Services:".bold());
            for service in &found {
                println!("  {}", services::describe(service));
            }
        }
        Ok(_) => {}
        Err(e) => crate::log_warn!("Could not list services for {}: {:#}", name, e),
    }
    Ok(())
}

pub fn find(ctx: &Context, component: &str, branch: &str) -> Result<()> {
    let pattern =
        Regex::new(branch).with_context(|| format!("Invalid branch pattern '{}'", branch))?;
    match ctx.helm().find_release_for_component(component, &pattern)? {
        Some(release) => println!("{}", release_row(&release)),
        None => println!("No {} workload matching {}", component, branch),
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct InstallOptions {
    pub chart: String,
    pub version: String,
    pub branch: Option<String>,
    pub revision: Option<String>,
    pub digest: Option<String>,
    pub values: Vec<ValueOverride>,
}

impl InstallOptions {
    fn artifact(&self) -> ChartArtifact {
        ChartArtifact {
            revision: self.revision.clone(),
            digest: self.digest.clone(),
            ..ChartArtifact::new(&self.chart, &self.version)
        }
    }
}

pub fn install(ctx: &Context, options: InstallOptions) -> Result<()> {
    let artifact = options.artifact();
    let release = with_spinner(&format!("Installing {}", artifact.chart_label()), || {
        ctx.helm()
            .install(&artifact, options.branch.as_deref(), &options.values)
    })?;

    println!("{} Installed {}", "✓".green(), release_row(&release));
    ctx.notify(
        NotificationKind::Success,
        "Application successfully installed",
        &format!("{} has been installed as {}", artifact.chart(), release.name),
    );
    Ok(())
}

pub fn upgrade(
    ctx: &Context,
    name: &str,
    version: Option<&str>,
    values: &[ValueOverride],
) -> Result<()> {
    let helm = ctx.helm();
    let current = helm.release_details(name)?.release;
    let artifact = version.map(|v| ChartArtifact::new(chart_name(&current.chart), v));

    let step = match &artifact {
        Some(a) => format!("Upgrading {} to {}", name, a.version),
        None => format!("Updating {} values", name),
    };
    let release = with_spinner(&step, || helm.upgrade(&current, values, artifact.as_ref()))?;

    println!("{} Upgraded {}", "✓".green(), release_row(&release));
    ctx.notify(
        NotificationKind::Success,
        "Application successfully upgraded",
        &format!("{} is now running {}", release.name, release.chart),
    );
    Ok(())
}

pub fn edit(ctx: &Context, name: &str, values: &[ValueOverride]) -> Result<()> {
    upgrade(ctx, name, None, values)
}

/// Namespace given on the command line, else the configured one
fn target_namespace<'a>(ctx: &'a Context, namespace: Option<&'a str>) -> &'a str {
    namespace.unwrap_or(&ctx.settings.kubernetes.namespace)
}

pub fn uninstall(ctx: &Context, name: &str, namespace: Option<&str>, yes: bool) -> Result<()> {
    let namespace = target_namespace(ctx, namespace);
    if !yes && !prompt::confirm(&format!("Uninstall {} from {}?", name, namespace))? {
        println!("Aborted");
        return Ok(());
    }

    with_spinner(&format!("Uninstalling {}", name), || {
        ctx.helm().uninstall(name, namespace)
    })?;

    println!("{} Uninstalled {}", "✓".green(), name);
    ctx.notify(
        NotificationKind::Info,
        "Application uninstalled",
        &format!("{} has been removed from {}", name, namespace),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_options_artifact() {
        let options = InstallOptions {
            chart: "redis:7.2".to_string(),
            version: "0.3.1".to_string(),
            revision: Some("2".to_string()),
            ..Default::default()
        };
        let artifact = options.artifact();
        assert_eq!(artifact.chart(), "redis");
        assert_eq!(artifact.version, "0.3.1");
        assert_eq!(artifact.revision.as_deref(), Some("2"));
        assert_eq!(artifact.digest, None);
    }

    #[test]
    fn test_target_namespace_falls_back_to_settings() {
        let mut settings = crate::config::Settings::default();
        settings.kubernetes.namespace = "apps".to_string();
        let ctx = Context::new(settings);

        assert_eq!(target_namespace(&ctx, None), "apps");
        assert_eq!(target_namespace(&ctx, Some("team-a")), "team-a");
    }

    #[test]
    fn test_instance_selector() {
        assert_eq!(
            instance_selector("redis-1712"),
            vec![(
                "app.kubernetes.io/instance".to_string(),
                "redis-1712".to_string()
            )]
        );
    }

    #[test]
    fn test_release_row_contains_fields() {
        let release = Release {
            name: "redis-1712".to_string(),
            namespace: "default".to_string(),
            status: WorkloadStatus::Running,
            chart: "redis-0.3.1".to_string(),
            version: "0.3.1".to_string(),
            app_version: "7.2.4".to_string(),
            notes: None,
        };
        let row = release_row(&release);
        assert!(row.starts_with("redis-1712"));
        assert!(row.contains("redis-0.3.1"));
        assert!(row.contains("7.2.4"));
    }
}
