#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::map_unwrap_or,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::needless_raw_string_hashes,
    clippy::redundant_closure_for_method_calls,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_wraps
)]

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use vr_training_admin::catalog::CatalogKind;
use vr_training_admin::{gateway, Config, SessionCommands, TrainingConsole};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CompletionShell {
    #[value(name = "bash")]
    Bash,
    #[value(name = "fish")]
    Fish,
    #[value(name = "zsh")]
    Zsh,
    #[value(name = "powershell")]
    PowerShell,
    #[value(name = "elvish")]
    Elvish,
}

/// `vr-training-admin` - scenarios, avatars, observers and training sessions.
#[derive(Parser, Debug)]
#[command(name = "vr-training-admin")]
#[command(version)]
#[command(about = "Management console for VR training sessions.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API server
    #[command(long_about = "\
Start the HTTP API server.

Serves the JSON API for sessions and the reference catalog. Bind \
address defaults to the values in your config file (gateway.host / \
gateway.port). Ctrl-C stops the server, settles background engine \
notifications and flushes sessions to storage.

Examples:
  vr-training-admin gateway                  # use config defaults
  vr-training-admin gateway -p 9000          # listen on port 9000
  vr-training-admin gateway --host 0.0.0.0   # bind to all interfaces
  vr-training-admin gateway -p 0             # random available port")]
    Gateway {
        /// Port to listen on (use 0 for random available port); defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Show configuration, storage and session counts
    Status,

    /// Manage training sessions
    #[command(long_about = "\
Manage training sessions.

Examples:
  vr-training-admin session list --limit 5
  vr-training-admin session create --scenario 1 --avatar 2 --observer 1
  vr-training-admin session set-status <id> completed
  vr-training-admin session payload <id>")]
    Session {
        #[command(subcommand)]
        session_command: SessionCommands,
    },

    /// Browse scenarios, avatars and observer profiles
    Catalog {
        /// Collection to list
        #[arg(value_enum)]
        kind: CatalogKind,

        /// Case-insensitive search text
        #[arg(long)]
        query: Option<String>,
    },

    /// Manage configuration
    #[command(long_about = "\
Manage configuration.

Use 'schema' to dump the full JSON Schema for the config file, which \
documents every available key, type, and default value.

Examples:
  vr-training-admin config schema              # print JSON Schema to stdout
  vr-training-admin config schema > schema.json")]
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },

    /// Generate shell completion script to stdout
    #[command(long_about = "\
Generate shell completion scripts for `vr-training-admin`.

The script is printed to stdout so it can be sourced directly:

Examples:
  source <(vr-training-admin completions bash)
  vr-training-admin completions zsh > ~/.zfunc/_vr-training-admin")]
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("VRTA_CONFIG_DIR", config_dir);
    }

    // Completions must remain stdout-only and should not load config or initialize logging.
    if let Commands::Completions { shell } = &cli.command {
        let mut stdout = std::io::stdout().lock();
        write_shell_completion(*shell, &mut stdout)?;
        return Ok(());
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    if let Commands::Config { config_command } = &cli.command {
        return match config_command {
            ConfigCommands::Schema => {
                let schema = schemars::schema_for!(Config);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&schema).context("failed to serialize JSON Schema")?
                );
                Ok(())
            }
        };
    }

    let config = Config::load_or_init().await?;

    match cli.command {
        Commands::Completions { .. } | Commands::Config { .. } => Ok(()),

        Commands::Gateway { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            if port == 0 {
                info!("Starting {} gateway on {host} (random port)", config.application_name);
            } else {
                info!("Starting {} gateway on {host}:{port}", config.application_name);
            }

            let console = Arc::new(TrainingConsole::from_config(&config).await?);
            let served = gateway::run_gateway(
                &host,
                port,
                Arc::new(config),
                Arc::clone(&console),
                shutdown_signal(),
            )
            .await;

            let report = console.shutdown().await?;
            info!(
                completed = report.completed,
                dropped = report.dropped,
                "console shut down"
            );
            served
        }

        Commands::Status => {
            let console = TrainingConsole::from_config(&config).await?;
            let store = console.store();

            println!("{} Status", config.application_name);
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!();
            println!(
                "Storage:     {} ({})",
                config.storage.backend,
                store.storage_location()
            );
            println!("Transitions: {}", store.policy().as_str());
            println!(
                "Engine:      {} -> {}",
                console.notifier().name(),
                console.notifier().destination()
            );
            println!(
                "Gateway:     {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!(
                "Shutdown:    {} (drain timeout {}s)",
                config.dispatch.shutdown_policy.as_str(),
                config.dispatch.drain_timeout_secs
            );
            println!();
            println!("Sessions ({} total):", store.len());
            for (status, count) in store.counts_by_status() {
                println!("  {:<10} {count}", status.as_str());
            }

            console.shutdown().await?;
            Ok(())
        }

        Commands::Session { session_command } => {
            let console = TrainingConsole::from_config(&config).await?;
            let outcome = handle_session_command(&console, session_command).await;
            let report = console.shutdown().await?;
            if report.dropped > 0 {
                tracing::warn!(dropped = report.dropped, "background jobs did not finish");
            }
            outcome
        }

        Commands::Catalog { kind, query } => {
            let console = TrainingConsole::from_config(&config).await?;
            let records = console
                .catalog()
                .search_json(kind, query.as_deref().unwrap_or(""));
            println!("{}", serde_json::to_string_pretty(&records)?);
            console.shutdown().await?;
            Ok(())
        }
    }
}

async fn handle_session_command(console: &TrainingConsole, command: SessionCommands) -> Result<()> {
    match command {
        SessionCommands::List { limit } => {
            let sessions = match limit {
                Some(limit) => console.recent_sessions(Some(limit)),
                None => console.sessions(),
            };
            if sessions.is_empty() {
                println!("No sessions.");
                return Ok(());
            }

            let now = Utc::now();
            println!(
                "{:<42} {:<10} {:<10} {:<10} {:<10} {:<20} DURATION",
                "ID", "STATUS", "SCENARIO", "AVATAR", "OBSERVER", "STARTED"
            );
            for session in sessions {
                println!(
                    "{:<42} {:<10} {:<10} {:<10} {:<10} {:<20} {}",
                    session.id,
                    session.status.as_str(),
                    session.scenario_id,
                    session.avatar_id,
                    session.observer_id,
                    session.start_time.format("%Y-%m-%d %H:%M:%S"),
                    session.formatted_duration(now)
                );
            }
            Ok(())
        }
        SessionCommands::Show { id } => {
            let details = console.session_details(&id)?;
            println!("{}", serde_json::to_string_pretty(&details)?);
            Ok(())
        }
        SessionCommands::Create {
            scenario,
            avatar,
            observer,
        } => {
            let session = console.start_session(&scenario, &avatar, &observer).await?;
            println!("Created session {} ({})", session.id, session.status);
            Ok(())
        }
        SessionCommands::SetStatus { id, status } => {
            let session = console.change_status(&id, &status).await?;
            println!("Session {} is now {}", session.id, session.status);
            Ok(())
        }
        SessionCommands::Delete { id } => {
            console.delete_session(&id)?;
            println!("Deleted session {id}");
            Ok(())
        }
        SessionCommands::Payload { id } => {
            let payload = console.integration_payload(&id)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn write_shell_completion<W: Write>(shell: CompletionShell, writer: &mut W) -> Result<()> {
    use clap_complete::generate;
    use clap_complete::shells;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, bin_name.clone(), writer),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, bin_name.clone(), writer),
        CompletionShell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, bin_name.clone(), writer);
        }
        CompletionShell::Elvish => generate(shells::Elvish, &mut cmd, bin_name, writer),
    }

    writer.flush()?;
    Ok(())
}
