//! Command implementations for the appco CLI

pub mod auth;
pub mod check;
pub mod config;
pub mod notifications;
pub mod releases;
pub mod serve;
pub mod values;

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::backend::BackendClient;
use crate::config::Settings;
use crate::docker::DockerCli;
use crate::helm::HelmCli;
use crate::k8s::PullSecret;
use crate::store::{Notification, NotificationKind};
use crate::utils::dryrun;

/// Effective settings plus the cluster the commands talk to
pub struct Context {
    pub settings: Settings,
    pub kubeconfig: Option<PathBuf>,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        let kubeconfig = settings.kubernetes.kubeconfig_path();
        Self {
            settings,
            kubeconfig,
        }
    }

    pub fn kubeconfig(&self) -> Option<&Path> {
        self.kubeconfig.as_deref()
    }

    pub fn helm(&self) -> HelmCli {
        HelmCli::new(&self.settings, self.kubeconfig())
    }

    pub fn docker(&self) -> DockerCli {
        DockerCli::new(self.settings.registry.clone())
    }

    pub fn pull_secret(&self) -> PullSecret {
        PullSecret::new(
            &self.settings.registry.pull_secret,
            &self.settings.registry.host,
            self.kubeconfig(),
        )
    }

    pub fn backend(&self) -> Result<BackendClient> {
        BackendClient::from_settings(&self.settings.backend)
    }

    /// Record an event in the backend the way the extension UI does.
    /// The backend is optional for CLI users, so failures only warn.
    pub fn notify(&self, kind: NotificationKind, title: &str, description: &str) {
        let notification = Notification::new(kind, title, description);
        let result = dryrun::exec_unless_dry_run_with_default(
            &format!("record notification '{}'", notification.title),
            (),
            || {
                self.backend()
                    .and_then(|backend| backend.add_notification(&notification))
                    .map(|_| ())
            },
        );
        if let Err(e) = result {
            crate::log_warn!("Could not record notification: {:#}", e);
        }
    }
}
