//! `appco serve`: run the extension backend

use anyhow::{Context as _, Result};
use std::sync::Arc;

use crate::config::Settings;
use crate::server::{self, AppState, Bind};

/// Overrides from the command line
#[derive(Debug, Default)]
pub struct ServeOptions {
    pub listen: Option<String>,
    pub socket: Option<String>,
    pub data_dir: Option<String>,
}

impl ServeOptions {
    fn apply(self, settings: &mut Settings) {
        if let Some(listen) = self.listen {
            settings.backend.listen = listen;
            settings.backend.socket = None;
        }
        if let Some(socket) = self.socket {
            settings.backend.socket = Some(socket);
        }
        if let Some(data_dir) = self.data_dir {
            settings.backend.data_dir = data_dir;
        }
    }
}

pub fn serve(mut settings: Settings, options: ServeOptions) -> Result<()> {
    options.apply(&mut settings);

    let bind = Bind::from_settings(&settings);
    crate::log_info!(
        "Storing notifications in {}",
        settings.backend.notifications_file().display()
    );
    let state = Arc::new(AppState::new(settings));

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(server::serve(state, bind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_wins_over_listen() {
        let mut settings = Settings::default();
        ServeOptions {
            listen: Some("0.0.0.0:9000".to_string()),
            socket: Some("/run/guest-services/backend.sock".to_string()),
            data_dir: Some("/tmp/appco".to_string()),
        }
        .apply(&mut settings);

        assert_eq!(settings.backend.listen, "0.0.0.0:9000");
        assert_eq!(
            Bind::from_settings(&settings),
            Bind::Unix("/run/guest-services/backend.sock".into())
        );
        assert_eq!(settings.backend.data_dir, "/tmp/appco");
    }

    #[test]
    fn test_listen_clears_configured_socket() {
        let mut settings = Settings::default();
        settings.backend.socket = Some("/tmp/old.sock".to_string());
        ServeOptions {
            listen: Some("127.0.0.1:8080".to_string()),
            ..Default::default()
        }
        .apply(&mut settings);

        assert_eq!(
            Bind::from_settings(&settings),
            Bind::Tcp("127.0.0.1:8080".to_string())
        );
    }
}
