pub mod commands;
pub mod console;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqflow_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use tracing::Level;

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "reqflow",
    about = "Reqflow request lifecycle CLI",
    long_about = "Draft, submit and settle procurement and finance requests against the Reqflow backend.",
    after_help = "Examples:\n  reqflow login --email staff@example.org\n  reqflow totals draft.json\n  reqflow submit draft.json --attach invoice.pdf\n  reqflow status payment 65f0c1 approved --yes"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a reqflow.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override api.base_url")]
    base_url: Option<String>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Sign in and persist the session token")]
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, help = "Password; read from REQFLOW_PASSWORD when omitted")]
        password: Option<String>,
    },
    #[command(about = "Show the signed-in user")]
    Whoami {
        #[arg(long, help = "Reload the user from the backend first")]
        refresh: bool,
    },
    #[command(about = "Clear the stored session")]
    Logout,
    #[command(about = "Compute row totals and the budget of a request file without sending it")]
    Totals { file: PathBuf },
    #[command(about = "Save a request file, or save and send it when a reviewer is set")]
    Submit {
        file: PathBuf,
        #[arg(long = "attach", help = "File to upload with the request; repeatable")]
        attachments: Vec<PathBuf>,
    },
    #[command(about = "Move a saved request to a new status")]
    Status {
        kind: String,
        id: String,
        status: String,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides {
            base_url: cli.base_url.clone(),
            log_level: cli.log_level.clone(),
            ..ConfigOverrides::default()
        },
    };

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            let result = CommandResult::failure(
                cli.command.name(),
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
            println!("{}", result.output);
            return ExitCode::from(result.exit_code);
        }
    };
    init_logging(&config);

    let result = dispatch(cli.command, &config, cli.config.as_deref());
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Login { .. } => "login",
            Self::Whoami { .. } => "whoami",
            Self::Logout => "logout",
            Self::Totals { .. } => "totals",
            Self::Submit { .. } => "submit",
            Self::Status { .. } => "status",
        }
    }
}

fn dispatch(command: Command, config: &AppConfig, config_path: Option<&Path>) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command.name(),
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(async {
        match command {
            Command::Config => commands::config::run(config, config_path),
            Command::Login { email, password } => {
                commands::session::login(config, &email, password).await
            }
            Command::Whoami { refresh } => commands::session::whoami(config, refresh).await,
            Command::Logout => commands::session::logout(config).await,
            Command::Totals { file } => commands::totals::run(&file),
            Command::Submit { file, attachments } => {
                commands::submit::run(config, &file, &attachments).await
            }
            Command::Status { kind, id, status, comment, yes } => {
                let args = commands::status::StatusArgs { kind, id, status, comment, assume_yes: yes };
                commands::status::run(config, args).await
            }
        }
    })
}

/// Logs go to stderr so stdout stays one JSON line per command.
fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
