//! PairAdmin CLI: drive the security core from a shell.
//!
//! Commands:
//! - `filter`    Redact sensitive data from stdin
//! - `validate`  Check a command against the security policy
//! - `audit`     Query or export the audit log
//! - `patterns`  List the active redaction patterns

use clap::{Parser, Subcommand};
use pairadmin_config::AppConfig;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(
    name = "pairadmin",
    about = "PairAdmin: redaction, command validation and audit trail",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "PAIRADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Redact sensitive data from stdin to stdout
    Filter {
        /// Print detection statistics as JSON instead of filtered text
        #[arg(long)]
        stats: bool,
    },

    /// Validate a command and record the verdict in the audit log
    Validate {
        /// Treat the command as an assistant suggestion
        #[arg(long)]
        ai: bool,

        /// Privilege the session currently holds
        #[arg(long, value_enum, default_value_t = commands::validate::PrivilegeArg::Standard)]
        privilege: commands::validate::PrivilegeArg,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,

        /// The command line to validate
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Inspect the audit log
    Audit {
        #[command(subcommand)]
        action: commands::audit::AuditAction,
    },

    /// List the active redaction patterns
    Patterns,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so stdout stays pipeable.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_from(&config_path)?;

    let code = match cli.command {
        Commands::Filter { stats } => commands::filter::run(&config, stats).await?,
        Commands::Validate {
            ai,
            privilege,
            json,
            command,
        } => commands::validate::run(&config, &command.join(" "), ai, privilege.into(), json).await?,
        Commands::Audit { action } => commands::audit::run(&config, action).await?,
        Commands::Patterns => commands::patterns::run(&config)?,
    };

    Ok(code)
}
