//! Kubectl wrapper utilities

use anyhow::{Context, Result};
use std::path::Path;

use crate::utils::HostCommand;

fn kubectl(args: &[&str], kubeconfig: Option<&Path>) -> HostCommand {
    HostCommand::new("kubectl")
        .args(args.iter().copied())
        .kubeconfig(kubeconfig)
}

/// Run a kubectl command that changes cluster state
pub fn run_kubectl(args: &[&str], kubeconfig: Option<&Path>) -> Result<()> {
    kubectl(args, kubeconfig)
        .run_mutating()
        .with_context(|| format!("kubectl command failed: {}", args.join(" ")))?;
    Ok(())
}

/// Run kubectl and capture output
pub fn run_kubectl_output(args: &[&str], kubeconfig: Option<&Path>) -> Result<String> {
    let output = kubectl(args, kubeconfig)
        .output()
        .with_context(|| format!("kubectl command failed: {}", args.join(" ")))?;
    Ok(output.stdout)
}

/// Create a resource from a manifest passed on stdin (`kubectl create -f -`)
pub fn create_manifest(manifest: &str, kubeconfig: Option<&Path>) -> Result<()> {
    kubectl(&["create", "-f", "-"], kubeconfig)
        .stdin(manifest)
        .run_mutating()
        .context("kubectl create failed")?;
    Ok(())
}

/// Verify the cluster answers (`kubectl get nodes`)
pub fn check_cluster(kubeconfig: Option<&Path>) -> Result<()> {
    run_kubectl_output(&["get", "nodes"], kubeconfig)
        .context("Kubernetes cluster is not reachable")?;
    Ok(())
}

/// Build the `-l key=value` selector arguments
pub fn selector_args(selectors: &[(String, String)]) -> Vec<String> {
    selectors
        .iter()
        .flat_map(|(key, value)| ["-l".to_string(), format!("{}={}", key, value)])
        .collect()
}
