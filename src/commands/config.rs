//! `appco config`: inspect and create the settings file

use anyhow::{Context as _, Result, bail};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::config::Settings;

/// Print the effective settings as TOML
pub fn show(settings: &Settings) -> Result<()> {
    match Settings::find_config_file() {
        Some(path) => println!("# loaded from {}", path.display()),
        None => println!("# no config file found, showing defaults"),
    }
    let body = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
    println!("{}", body);
    Ok(())
}

/// Write the example config to `path` (or the default location)
pub fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.unwrap_or_else(Settings::default_config_path);
    write_example(&path, force)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

fn write_example(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file {} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, Settings::example_config()?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_example_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_example(&path, false).unwrap();
        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_write_example_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine").unwrap();

        assert!(write_example(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        write_example(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[registry]"));
    }
}
