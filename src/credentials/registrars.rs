//! Registrars for the systems the extension authenticates

use anyhow::Result;
use std::path::Path;

use super::{Credentials, Registrar};
use crate::backend::{BackendClient, BackendError};
use crate::config::Settings;
use crate::docker::DockerCli;
use crate::helm::HelmCli;
use crate::k8s::PullSecret;
use crate::utils::CommandError;

/// `docker login` against the containers repository
pub struct DockerRegistrar {
    docker: DockerCli,
}

impl DockerRegistrar {
    pub fn new(docker: DockerCli) -> Self {
        Self { docker }
    }
}

impl Registrar for DockerRegistrar {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn logout(&self) -> Result<()> {
        Ok(self.docker.logout()?)
    }

    fn login(&self, credentials: &Credentials) -> Result<()> {
        Ok(self.docker.login(&credentials.username, &credentials.token)?)
    }

    fn explain(&self, error: &anyhow::Error) -> String {
        let unauthorized = match error.downcast_ref::<CommandError>() {
            Some(e) => e.stderr().contains("401 Unauthorized"),
            None => format!("{:#}", error).contains("401 Unauthorized"),
        };
        if unauthorized {
            "Invalid authentication pair".to_string()
        } else {
            "Error running docker login, make sure the daemon is started".to_string()
        }
    }
}

/// The docker-registry pull secret in the cluster
pub struct KubernetesRegistrar {
    secret: PullSecret,
}

impl KubernetesRegistrar {
    pub fn new(secret: PullSecret) -> Self {
        Self { secret }
    }
}

impl Registrar for KubernetesRegistrar {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn logout(&self) -> Result<()> {
        self.secret.delete()
    }

    fn login(&self, credentials: &Credentials) -> Result<()> {
        self.secret.create(credentials)
    }

    fn explain(&self, _error: &anyhow::Error) -> String {
        "Error creating kubernetes secret, make sure the cluster is up and reachable".to_string()
    }
}

/// `helm registry login` on this host
pub struct HelmRegistrar {
    helm: HelmCli,
    host: String,
}

impl HelmRegistrar {
    pub fn new(helm: HelmCli, host: impl Into<String>) -> Self {
        Self {
            helm,
            host: host.into(),
        }
    }
}

impl Registrar for HelmRegistrar {
    fn name(&self) -> &'static str {
        "helm"
    }

    fn logout(&self) -> Result<()> {
        Ok(self.helm.registry_logout()?)
    }

    fn login(&self, credentials: &Credentials) -> Result<()> {
        Ok(self
            .helm
            .registry_login(&credentials.username, &credentials.token)?)
    }

    fn explain(&self, _error: &anyhow::Error) -> String {
        format!(
            "Error running helm registry login, make sure you can reach {}",
            self.host
        )
    }
}

/// The extension backend session, persisted in the backend's helm config
pub struct BackendRegistrar {
    client: BackendClient,
}

impl BackendRegistrar {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

impl Registrar for BackendRegistrar {
    fn name(&self) -> &'static str {
        "backend"
    }

    fn logout(&self) -> Result<()> {
        Ok(self.client.logout()?)
    }

    fn login(&self, credentials: &Credentials) -> Result<()> {
        Ok(self.client.login(&credentials.username, &credentials.token)?)
    }

    fn explain(&self, error: &anyhow::Error) -> String {
        match error.downcast_ref::<BackendError>() {
            Some(e) if e.is_timeout() => {
                "Timeout connecting to extension backend. Make sure it is up and running.".to_string()
            }
            _ => "Cannot persist the authentication in the extension backend. Make sure it is up and running"
                .to_string(),
        }
    }
}

/// Registrars in saga order: docker, kubernetes, helm, then the backend
pub fn host_registrars(
    settings: &Settings,
    kubeconfig: Option<&Path>,
    include_backend: bool,
) -> Result<Vec<Box<dyn Registrar>>> {
    let registry = &settings.registry;

    let mut registrars: Vec<Box<dyn Registrar>> = vec![
        Box::new(DockerRegistrar::new(DockerCli::new(registry.clone()))),
        Box::new(KubernetesRegistrar::new(PullSecret::new(
            &registry.pull_secret,
            &registry.host,
            kubeconfig,
        ))),
        Box::new(HelmRegistrar::new(
            HelmCli::new(settings, kubeconfig),
            &registry.host,
        )),
    ];

    if include_backend {
        registrars.push(Box::new(BackendRegistrar::new(
            BackendClient::from_settings(&settings.backend)?,
        )));
    }

    Ok(registrars)
}
