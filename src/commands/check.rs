//! `appco check`: is this host ready for the Application Collection?

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::utils::{AppcoError, CommonPrereqs, Prerequisite};

fn report(ok: bool, label: &str, detail: &str) {
    if ok {
        println!("  {} {}", "✓".green(), label);
    } else {
        println!("  {} {}: {}", "✗".red(), label, detail);
    }
}

pub fn check(ctx: &Context) -> Result<()> {
    crate::log_info!("Checking prerequisites...");
    let mut problems = 0;

    println!("{}", "Tools".bold());
    let tools = CommonPrereqs::all();
    let tools: Vec<&dyn Prerequisite> = tools.iter().map(|t| t as &dyn Prerequisite).collect();
    let (found, missing) = CommonPrereqs::check_all(&tools);
    for name in &found {
        report(true, name, "");
    }
    for (name, hint) in &missing {
        report(false, name, hint);
        problems += 1;
    }

    println!("{}", "Host".bold());
    let docker_cli = ctx.docker();
    let docker = docker_cli.check();
    report(docker.is_ok(), "docker daemon", &error_text(&docker));
    problems += usize::from(docker.is_err());
    if docker.is_ok() {
        match docker_cli.list_images() {
            Ok(images) => println!(
                "    {} image(s) pulled from {}",
                images.len(),
                ctx.settings.registry.host
            ),
            Err(e) => crate::log_warn!("Could not list images: {:#}", e),
        }
    }

    let helm = ctx.helm().check();
    report(helm.is_ok(), "helm", &error_text(&helm));
    problems += usize::from(helm.is_err());

    let cluster = crate::k8s::kubectl::check_cluster(ctx.kubeconfig());
    report(cluster.is_ok(), "kubernetes cluster", &error_text(&cluster));
    problems += usize::from(cluster.is_err());

    println!("{}", "Authentication".bold());
    let secret = ctx.pull_secret();
    let secret_ok = cluster.is_ok() && secret.exists();
    report(
        secret_ok,
        &format!("pull secret {}", secret.name()),
        "missing, run 'appco auth login'",
    );
    problems += usize::from(!secret_ok);

    let auth = ctx.helm().registry_auth();
    let auth_ok = matches!(auth, Ok(Some(_)));
    let auth_detail = match &auth {
        Err(e) => format!("{:#}", e),
        _ => "not logged in, run 'appco auth login'".to_string(),
    };
    report(auth_ok, "helm registry login", &auth_detail);
    problems += usize::from(!auth_ok);

    // The backend only runs inside the extension, so it never fails the check
    println!("{}", "Extension backend".bold());
    match ctx.backend() {
        Ok(backend) => match backend.health() {
            Ok(()) => report(true, backend.base_url().as_str(), ""),
            Err(e) => println!("  {} {}: {}", "!".yellow(), backend.base_url(), e),
        },
        Err(e) => println!("  {} {:#}", "!".yellow(), e),
    }

    if problems == 0 {
        println!("{} Ready to use the Application Collection", "✓".green());
        Ok(())
    } else {
        Err(AppcoError::new(format!("{} check(s) failed", problems))
            .suggest("Fix the items marked ✗ and run 'appco check' again")
            .into())
    }
}

fn error_text<T>(result: &Result<T>) -> String {
    match result {
        Ok(_) => String::new(),
        Err(e) => format!("{:#}", e),
    }
}
