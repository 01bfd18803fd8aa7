//! `appco auth`: save, show and drop the registry credentials

use anyhow::{Context as _, Result};
use colored::Colorize;
use std::io::BufRead;

use super::Context;
use crate::credentials::{self, CredentialError, Credentials, Registrar};
use crate::utils::progress::StepProgress;
use crate::utils::{AppcoError, prompt};

#[derive(Debug, Default)]
pub struct LoginOptions {
    pub username: Option<String>,
    /// Read the access token from stdin instead of prompting
    pub token_stdin: bool,
    /// Do not persist the credentials in the extension backend
    pub skip_backend: bool,
}

fn read_token_from_stdin() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read access token from stdin")?;
    Ok(line.trim().to_string())
}

pub fn login(ctx: &Context, options: LoginOptions) -> Result<()> {
    let username = match options.username {
        Some(username) => username,
        None => prompt::input("Username (e-mail)", None)?,
    };
    let token = if options.token_stdin {
        read_token_from_stdin()?
    } else {
        prompt::password("Access token")?
    };

    let credentials = Credentials::new(username, token)?;
    let registrars =
        credentials::host_registrars(&ctx.settings, ctx.kubeconfig(), !options.skip_backend)?;
    let registrars: Vec<&dyn Registrar> = registrars.iter().map(|r| r.as_ref()).collect();

    let progress = StepProgress::new("Saving authentication");
    match credentials::propagate(&credentials, &registrars) {
        Ok(report) => {
            progress.finish_success();
            for (step, reason) in &report.logout_warnings {
                println!("  {} {} logout skipped: {}", "!".yellow(), step, reason);
            }
            println!(
                "{} Logged in as {} ({})",
                "✓".green(),
                credentials.username.bold(),
                report.completed.join(", ")
            );
            Ok(())
        }
        Err(CredentialError::StepFailed { step, message, .. }) => {
            progress.finish_error(&message);
            Err(AppcoError::new(message)
                .suggest(format!("The {} step failed; earlier steps already hold the new credentials", step))
                .suggest("Fix the problem and run 'appco auth login' again")
                .into())
        }
        Err(e) => {
            progress.finish();
            Err(e.into())
        }
    }
}

pub fn logout(ctx: &Context, yes: bool, skip_backend: bool) -> Result<()> {
    if !yes && !prompt::confirm("Remove the Application Collection credentials from this host?")? {
        println!("Aborted");
        return Ok(());
    }

    let registrars = credentials::host_registrars(&ctx.settings, ctx.kubeconfig(), !skip_backend)?;
    let registrars: Vec<&dyn Registrar> = registrars.iter().map(|r| r.as_ref()).collect();

    let failures = credentials::revoke(&registrars);
    for (step, reason) in &failures {
        println!("  {} {} logout failed: {}", "!".yellow(), step, reason);
    }
    if failures.is_empty() {
        println!("{} Logged out", "✓".green());
    } else {
        println!("{} Logged out with warnings", "!".yellow());
    }
    Ok(())
}

/// What each system currently knows about the user
pub fn status(ctx: &Context) -> Result<()> {
    let helm = ctx.helm();
    match helm.registry_auth()? {
        Some(auth) => match Credentials::from_registry_auth(&auth) {
            Ok(credentials) => println!(
                "{} helm registry: logged in as {}",
                "✓".green(),
                credentials.username.bold()
            ),
            Err(e) => println!("{} helm registry: {}", "✗".red(), e),
        },
        None => println!(
            "{} helm registry: not logged in to {}",
            "✗".red(),
            ctx.settings.registry.host
        ),
    }

    let secret = ctx.pull_secret();
    if secret.exists() {
        println!("{} pull secret {} present", "✓".green(), secret.name());
    } else {
        println!("{} pull secret {} missing", "✗".red(), secret.name());
    }

    match ctx.backend().and_then(|backend| backend.auth()) {
        Ok(Some(_)) => println!("{} backend: authentication stored", "✓".green()),
        Ok(None) => println!("{} backend: no authentication stored", "✗".red()),
        Err(e) => println!("{} backend: {:#}", "!".yellow(), e),
    }
    Ok(())
}
