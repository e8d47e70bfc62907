pub mod console;
pub mod keys;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::CommandFactory;
use colored::Colorize;

use leizi_api::{BackendClient, SftpListRequest};
use leizi_terminal::{RawDecoder, WsTransport};
use leizi_types::{ConnectionConfig, SessionKind};

use crate::cli::{Cli, Commands, ConfigCommands, ShortcutCommands};
use crate::config::{default_config_path, ClientConfig};
use crate::logging;

pub use console::ConsoleHost;

/// Settings resolved from the command line and the config file
pub struct AppContext {
    pub config: ClientConfig,
    pub config_path: PathBuf,
    pub backend: Option<String>,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let config = ClientConfig::load(&config_path)?;
        Ok(Self {
            config,
            config_path,
            backend: cli.backend.clone(),
        })
    }

    pub fn client(&self) -> BackendClient {
        BackendClient::new(self.config.endpoint(self.backend.as_deref()))
    }
}

/// Run a parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "leizi", &mut io::stdout());
        return Ok(());
    }

    let opens_console = matches!(cli.command, Commands::Connect(_) | Commands::Open { .. });
    if opens_console {
        let log_path = match &cli.log_file {
            Some(path) => path.clone(),
            None => logging::default_log_path()?,
        };
        logging::init_file(&log_path)?;
    } else {
        logging::init_stderr();
    }

    let context = AppContext::from_cli(&cli)?;

    match cli.command {
        Commands::Connect(args) => {
            let (kind, config) = args.to_form().submit()?;
            run_console(&context, vec![(kind, config)]).await
        }
        Commands::Open { names, password } => {
            let sessions = resolve_shortcuts(&context.config, &names, password.as_deref())?;
            run_console(&context, sessions).await
        }
        Commands::Ports => list_ports(&context).await,
        Commands::Sftp {
            host,
            path,
            port,
            username,
            password,
            pkey,
        } => {
            let request = SftpListRequest {
                host,
                port,
                username,
                password,
                pkey,
                path,
            };
            list_directory(&context, &request).await
        }
        Commands::Shortcuts { command } => manage_shortcuts(context, command).await,
        Commands::Config { command } => manage_remote_config(&context, command).await,
        Commands::Completions { .. } => Ok(()),
    }
}

/// Turn shortcut names into session parameters, failing on the first bad one
pub fn resolve_shortcuts(
    config: &ClientConfig,
    names: &[String],
    password: Option<&str>,
) -> Result<Vec<(SessionKind, ConnectionConfig)>> {
    names
        .iter()
        .map(|name| {
            let shortcut = config
                .find_shortcut(name)
                .with_context(|| format!("Unknown shortcut '{}'", name))?;
            shortcut
                .connection
                .open(password)
                .with_context(|| format!("Shortcut '{}' is invalid", name))
        })
        .collect()
}

async fn run_console(context: &AppContext, sessions: Vec<(SessionKind, ConnectionConfig)>) -> Result<()> {
    let endpoint = context.config.endpoint(context.backend.as_deref());
    log::info!("Using backend {}", endpoint.base_url());

    let host = ConsoleHost::new(
        Arc::new(WsTransport::new(endpoint)),
        Arc::new(RawDecoder),
        context.config.cell_metrics(),
        context.config.scrollback_lines,
    );
    host.run(sessions).await
}

async fn list_ports(context: &AppContext) -> Result<()> {
    let ports = context
        .client()
        .serial_ports()
        .await
        .context("Failed to list serial ports")?;
    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

async fn list_directory(context: &AppContext, request: &SftpListRequest) -> Result<()> {
    let files = context
        .client()
        .sftp_list(request)
        .await
        .with_context(|| format!("Failed to list {}:{}", request.host, request.path))?;
    println!("{}", format!("{}:{}", request.host, request.path).bright_blue());
    for file in files {
        println!("  {}", file);
    }
    Ok(())
}

async fn manage_shortcuts(mut context: AppContext, command: ShortcutCommands) -> Result<()> {
    match command {
        ShortcutCommands::List => {
            if context.config.shortcuts.is_empty() {
                println!("{}", "No shortcuts saved".yellow());
            }
            for shortcut in &context.config.shortcuts {
                let saved = &shortcut.connection;
                let target = match saved.kind {
                    SessionKind::Serial => saved.device.clone().unwrap_or_default(),
                    _ => match saved.port {
                        Some(port) => format!("{}:{}", saved.host.as_deref().unwrap_or_default(), port),
                        None => saved.host.clone().unwrap_or_default(),
                    },
                };
                println!("{:<16} {:<7} {}", shortcut.name.bold(), saved.kind.to_string().cyan(), target);
            }
        }
        ShortcutCommands::Push => {
            let shortcuts = context.config.shortcut_map();
            if shortcuts.is_empty() {
                bail!("No shortcuts in {} to push", context.config_path.display());
            }
            context
                .client()
                .save_remote_shortcuts(&shortcuts)
                .await
                .context("Failed to upload shortcuts")?;
            println!("{} {} shortcut(s)", "Pushed".green(), shortcuts.len());
        }
        ShortcutCommands::Pull => {
            let remote = context
                .client()
                .remote_shortcuts()
                .await
                .context("Failed to download shortcuts")?;
            let total = remote.len();
            let added = context.config.merge_shortcuts(remote);
            context.config.save(&context.config_path)?;
            println!(
                "{} {} shortcut(s), {} new, into {}",
                "Pulled".green(),
                total,
                added,
                context.config_path.display()
            );
        }
    }
    Ok(())
}

/// Read a settings file for upload; the backend stores a single JSON object
pub fn read_remote_config(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    if !value.is_object() {
        bail!("{} must contain a JSON object", path.display());
    }
    Ok(value)
}

async fn manage_remote_config(context: &AppContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Pull { output } => {
            let settings = context
                .client()
                .remote_config()
                .await
                .context("Failed to download settings")?;
            let text = serde_json::to_string_pretty(&settings)?;
            match output {
                Some(path) => {
                    fs::write(&path, text + "\n").with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} settings into {}", "Pulled".green(), path.display());
                }
                None => println!("{}", text),
            }
        }
        ConfigCommands::Push { file } => {
            let settings = read_remote_config(&file)?;
            context
                .client()
                .save_remote_config(&settings)
                .await
                .context("Failed to upload settings")?;
            println!("{} settings from {}", "Pushed".green(), file.display());
        }
    }
    Ok(())
}
