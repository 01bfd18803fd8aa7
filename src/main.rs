//! appco CLI - Application Collection extension backend and host tooling

use anyhow::Result;
use appco::commands::{self, Context};
use appco::config::Settings;
use appco::helm::ValueOverride;
use appco::log_info;
use appco::store::NotificationKind;
use appco::utils::{dryrun, enhance_error, errors::display_error_and_exit, logger};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "appco")]
#[command(author, version, about = "Application Collection extension backend and CLI", long_about = None)]
struct Cli {
    /// Verbose output (can be used multiple times: -v, -vv, -vvv)
    /// -v: INFO, -vv: DEBUG, -vvv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry-run mode: show what would be done without making changes
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path to config file (default: .appco.toml or ~/.config/appco/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to kubeconfig file
    #[arg(long, global = true, env = "KUBECONFIG")]
    kubeconfig: Option<String>,

    /// Base URL of the extension backend
    #[arg(long, global = true, env = "APPCO_BACKEND_URL")]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extension backend service
    Serve {
        /// TCP address to listen on
        #[arg(long)]
        listen: Option<String>,

        /// Unix socket to listen on instead of TCP
        #[arg(long)]
        socket: Option<String>,

        /// Directory holding the notifications file
        #[arg(long, env = "APPCO_DATA_DIR")]
        data_dir: Option<String>,
    },

    /// Manage the registry credentials
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage installed workloads
    Releases {
        #[command(subcommand)]
        command: ReleasesCommands,
    },

    /// Show the local values shipped with a chart version
    Values {
        /// Chart name
        chart: String,

        /// Chart version
        version: String,

        /// Ask the extension backend instead of pulling the chart here
        #[arg(long)]
        from_backend: bool,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage extension notifications
    Notifications {
        #[command(subcommand)]
        command: NotificationsCommands,
    },

    /// Check prerequisites, cluster and authentication
    Check,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Save credentials in docker, kubernetes, helm and the backend
    Login {
        /// Username (your account e-mail)
        #[arg(short, long)]
        username: Option<String>,

        /// Read the access token from stdin
        #[arg(long)]
        token_stdin: bool,

        /// Do not store the credentials in the extension backend
        #[arg(long)]
        skip_backend: bool,
    },

    /// Remove the credentials everywhere
    Logout {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Do not touch the extension backend
        #[arg(long)]
        skip_backend: bool,
    },

    /// Show the current authentication state
    Status,
}

#[derive(Subcommand)]
enum ReleasesCommands {
    /// List workloads installed through the extension
    List,

    /// Show details, history, notes and services of a release
    Show {
        name: String,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the workload of a component tracking a branch
    Find {
        component: String,

        /// Regex matched against the latest revision's app version
        #[arg(short, long)]
        branch: String,
    },

    /// Install a chart
    Install {
        /// Chart name, optionally with a tag (redis or redis:7.2)
        chart: String,

        /// Chart version
        #[arg(long)]
        version: String,

        /// Branch the version belongs to
        #[arg(long)]
        branch: Option<String>,

        /// Artifact revision
        #[arg(long)]
        revision: Option<String>,

        /// Artifact digest
        #[arg(long)]
        digest: Option<String>,

        /// Value overrides (key=value)
        #[arg(long = "set")]
        values: Vec<ValueOverride>,
    },

    /// Upgrade a release, optionally to another chart version
    Upgrade {
        name: String,

        /// Target chart version
        #[arg(long)]
        version: Option<String>,

        /// Value overrides (key=value)
        #[arg(long = "set")]
        values: Vec<ValueOverride>,
    },

    /// Change the values of a release
    Edit {
        name: String,

        /// Value overrides (key=value)
        #[arg(long = "set", required = true)]
        values: Vec<ValueOverride>,
    },

    /// Uninstall a release
    Uninstall {
        name: String,

        /// Namespace of the release (default: kubernetes.namespace from config)
        #[arg(short, long)]
        namespace: Option<String>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Info,
    Success,
    Warning,
    Error,
}

impl From<KindArg> for NotificationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Info => NotificationKind::Info,
            KindArg::Success => NotificationKind::Success,
            KindArg::Warning => NotificationKind::Warning,
            KindArg::Error => NotificationKind::Error,
        }
    }
}

#[derive(Subcommand)]
enum NotificationsCommands {
    /// List notifications, newest first
    List {
        /// Include dismissed notifications
        #[arg(short, long)]
        all: bool,
    },

    /// Add a notification
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long = "type", value_enum, default_value = "info")]
        kind: KindArg,

        #[arg(long)]
        href: Option<String>,

        #[arg(long)]
        action_text: Option<String>,
    },

    /// Mark a notification as dismissed
    Dismiss { id: String },

    /// Delete a notification
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Write an example configuration file
    Init {
        /// Where to write (default: ~/.config/appco/config.toml)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)?,
        None => Settings::load(),
    };

    if let Some(kubeconfig) = &cli.kubeconfig {
        settings.kubernetes.kubeconfig = Some(kubeconfig.clone());
    }
    if let Some(url) = &cli.backend_url {
        settings.backend.url = url.clone();
    }
    Ok(settings)
}

fn main() {
    let cli = Cli::parse();

    logger::init(cli.verbose);

    if cli.dry_run {
        dryrun::set_dry_run(true);
        log_info!("DRY RUN MODE: No changes will be made");
    }

    if let Err(e) = run(cli) {
        display_error_and_exit(enhance_error(e));
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Serve {
            listen,
            socket,
            data_dir,
        } => commands::serve::serve(
            settings,
            commands::serve::ServeOptions {
                listen,
                socket,
                data_dir,
            },
        ),
        Commands::Auth { command } => handle_auth_command(&Context::new(settings), command),
        Commands::Releases { command } => {
            handle_releases_command(&Context::new(settings), command)
        }
        Commands::Values {
            chart,
            version,
            from_backend,
            json,
        } => commands::values::show(&Context::new(settings), &chart, &version, from_backend, json),
        Commands::Notifications { command } => {
            handle_notifications_command(&Context::new(settings), command)
        }
        Commands::Check => commands::check::check(&Context::new(settings)),
        Commands::Config { command } => match command {
            ConfigCommands::Show => commands::config::show(&settings),
            ConfigCommands::Init { path, force } => commands::config::init(path, force),
        },
        Commands::Completion { shell } => handle_completion_command(shell),
        Commands::Version => handle_version_command(),
    }
}

fn handle_auth_command(ctx: &Context, command: AuthCommands) -> Result<()> {
    match command {
        AuthCommands::Login {
            username,
            token_stdin,
            skip_backend,
        } => commands::auth::login(
            ctx,
            commands::auth::LoginOptions {
                username,
                token_stdin,
                skip_backend,
            },
        ),
        AuthCommands::Logout { yes, skip_backend } => {
            commands::auth::logout(ctx, yes, skip_backend)
        }
        AuthCommands::Status => commands::auth::status(ctx),
    }
}

fn handle_releases_command(ctx: &Context, command: ReleasesCommands) -> Result<()> {
    use commands::releases;

    match command {
        ReleasesCommands::List => releases::list(ctx),
        ReleasesCommands::Show { name, json } => releases::show(ctx, &name, json),
        ReleasesCommands::Find { component, branch } => releases::find(ctx, &component, &branch),
        ReleasesCommands::Install {
            chart,
            version,
            branch,
            revision,
            digest,
            values,
        } => releases::install(
            ctx,
            releases::InstallOptions {
                chart,
                version,
                branch,
                revision,
                digest,
                values,
            },
        ),
        ReleasesCommands::Upgrade {
            name,
            version,
            values,
        } => releases::upgrade(ctx, &name, version.as_deref(), &values),
        ReleasesCommands::Edit { name, values } => releases::edit(ctx, &name, &values),
        ReleasesCommands::Uninstall {
            name,
            namespace,
            yes,
        } => releases::uninstall(ctx, &name, namespace.as_deref(), yes),
    }
}

fn handle_notifications_command(ctx: &Context, command: NotificationsCommands) -> Result<()> {
    use commands::notifications;

    match command {
        NotificationsCommands::List { all } => notifications::list(ctx, all),
        NotificationsCommands::Add {
            title,
            description,
            kind,
            href,
            action_text,
        } => notifications::add(
            ctx,
            notifications::AddOptions {
                title,
                description,
                kind: kind.into(),
                href,
                action_text,
            },
        ),
        NotificationsCommands::Dismiss { id } => notifications::dismiss(ctx, &id),
        NotificationsCommands::Delete { id } => notifications::delete(ctx, &id),
    }
}

fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "appco", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> Result<()> {
    println!("appco {}", env!("CARGO_PKG_VERSION"));
    println!("Application Collection extension backend and CLI");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install_with_overrides() {
        let cli = Cli::try_parse_from([
            "appco", "releases", "install", "redis", "--version", "0.3.1", "--set",
            "auth.enabled=false", "--set", "replicas=2",
        ])
        .unwrap();
        match cli.command {
            Commands::Releases {
                command: ReleasesCommands::Install { chart, values, .. },
            } => {
                assert_eq!(chart, "redis");
                assert_eq!(values.len(), 2);
                assert_eq!(values[0].key, "auth.enabled");
            }
            _ => panic!("expected releases install"),
        }
    }

    #[test]
    fn test_uninstall_namespace_is_optional() {
        let cli = Cli::try_parse_from(["appco", "releases", "uninstall", "redis-1", "--yes"]).unwrap();
        match cli.command {
            Commands::Releases {
                command: ReleasesCommands::Uninstall { namespace, yes, .. },
            } => {
                assert_eq!(namespace, None);
                assert!(yes);
            }
            _ => panic!("expected releases uninstall"),
        }
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        assert!(
            Cli::try_parse_from(["appco", "releases", "edit", "redis-1", "--set", "novalue"])
                .is_err()
        );
    }
}
