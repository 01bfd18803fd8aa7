//! Docker CLI operations against the Application Collection registry

use anyhow::{Context, Result};

use crate::config::settings::RegistrySettings;
use crate::utils::{CommandError, HostCommand};

/// Docker CLI handle bound to one registry
#[derive(Debug, Clone)]
pub struct DockerCli {
    registry: RegistrySettings,
}

impl DockerCli {
    pub fn new(registry: RegistrySettings) -> Self {
        Self { registry }
    }

    /// Verify the daemon is reachable (`docker info`)
    pub fn check(&self) -> Result<()> {
        HostCommand::new("docker")
            .arg("info")
            .output()
            .context("Docker daemon is not reachable")?;
        Ok(())
    }

    /// `docker login <host>/containers -u <user> --password-stdin`
    pub fn login(&self, username: &str, token: &str) -> Result<(), CommandError> {
        crate::log_info!(
            "Logging docker into {}",
            self.registry.containers_repository()
        );
        login_command(&self.registry, username, token).run_mutating()?;
        Ok(())
    }

    /// `docker logout <host>`
    pub fn logout(&self) -> Result<(), CommandError> {
        crate::log_info!("Logging docker out of {}", self.registry.host);
        logout_command(&self.registry).run_mutating()?;
        Ok(())
    }

    /// Local images pulled from the registry, as `repository:tag`
    pub fn list_images(&self) -> Result<Vec<String>> {
        let output = HostCommand::new("docker")
            .args(["images", "--format", "{{.Repository}}:{{.Tag}}"])
            .output()
            .context("Failed to list images")?;

        Ok(filter_registry_images(&output.stdout, &self.registry.host))
    }
}

fn login_command(registry: &RegistrySettings, username: &str, token: &str) -> HostCommand {
    HostCommand::new("docker")
        .args(["login", &registry.containers_repository()])
        .args(["-u", username, "--password-stdin"])
        .stdin(token)
}

fn logout_command(registry: &RegistrySettings) -> HostCommand {
    HostCommand::new("docker").args(["logout", &registry.host])
}

fn filter_registry_images(listing: &str, host: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(host))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_keeps_token_out_of_argv() {
        let cmd = login_command(&RegistrySettings::default(), "me@example.com", "tok3n");
        assert_eq!(
            cmd.arguments(),
            &[
                "login",
                "dp.apps.rancher.io/containers",
                "-u",
                "me@example.com",
                "--password-stdin"
            ]
        );
        assert!(!cmd.display().contains("tok3n"));
    }

    #[test]
    fn test_logout_targets_host() {
        let cmd = logout_command(&RegistrySettings::default());
        assert_eq!(cmd.display(), "docker logout dp.apps.rancher.io");
    }

    #[test]
    fn test_filter_registry_images() {
        let listing = "dp.apps.rancher.io/containers/redis:7.2\nnginx:latest\n\ndp.apps.rancher.io/containers/git:2.43\n";
        assert_eq!(
            filter_registry_images(listing, "dp.apps.rancher.io"),
            vec![
                "dp.apps.rancher.io/containers/redis:7.2",
                "dp.apps.rancher.io/containers/git:2.43"
            ]
        );
    }
}
