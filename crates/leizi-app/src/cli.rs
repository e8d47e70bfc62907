use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use leizi_types::{ConnectionForm, SessionKind};

/// CLI arguments for leizi
#[derive(Parser, Debug)]
#[command(name = "leizi")]
#[command(about = "Leizi - multi-tab SSH, Telnet and serial terminal client")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file (default: ~/.leizi/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long, global = true, value_name = "URL", env = "LEIZI_BACKEND_URL")]
    pub backend: Option<String>,

    /// Log file used while the console is open (default: ~/.leizi/logs/leizi.log)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open a new session in the console
    Connect(ConnectArgs),
    /// Open one tab per saved shortcut
    Open {
        /// Shortcut names from the config file
        #[arg(required = true)]
        names: Vec<String>,
        /// Password for shortcuts that need one
        #[arg(long, env = "LEIZI_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// List serial ports available on the backend
    Ports,
    /// List a remote directory over SFTP
    Sftp {
        /// SSH host
        host: String,
        /// Directory to list
        #[arg(default_value = ".")]
        path: String,
        #[arg(long, default_value_t = leizi_types::DEFAULT_SSH_PORT)]
        port: u16,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long, env = "LEIZI_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Private key path on the backend host
        #[arg(long)]
        pkey: Option<String>,
    },
    /// Manage saved shortcuts
    Shortcuts {
        #[command(subcommand)]
        command: ShortcutCommands,
    },
    /// Read or replace the settings stored on the backend
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShortcutCommands {
    /// Show shortcuts from the config file
    List,
    /// Upload local shortcuts to the backend
    Push,
    /// Download the backend's shortcuts into the config file
    Pull,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the backend's settings, or write them to a file
    Pull {
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Replace the backend's settings with a JSON object from a file
    Push {
        #[arg(value_name = "PATH")]
        file: PathBuf,
    },
}

/// Connection parameters for `leizi connect`
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Connection type
    #[arg(value_parser = parse_kind)]
    pub kind: SessionKind,
    /// Remote host (ssh, telnet)
    #[arg(long)]
    pub host: Option<String>,
    /// Remote port (default 22 for ssh, 23 for telnet)
    #[arg(short, long)]
    pub port: Option<String>,
    #[arg(short, long)]
    pub username: Option<String>,
    #[arg(long, env = "LEIZI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Private key path on the backend host
    #[arg(long)]
    pub pkey: Option<String>,
    /// Serial device, e.g. /dev/ttyUSB0
    #[arg(long)]
    pub device: Option<String>,
    #[arg(long)]
    pub baudrate: Option<String>,
}

fn parse_kind(value: &str) -> Result<SessionKind, String> {
    value.parse().map_err(|e: leizi_types::FormError| e.to_string())
}

impl ConnectArgs {
    /// The arguments as a new-session form, validated by `submit`
    pub fn to_form(&self) -> ConnectionForm {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        ConnectionForm {
            kind: self.kind.as_str().to_string(),
            host: text(&self.host),
            port: text(&self.port),
            username: text(&self.username),
            password: text(&self.password),
            pkey: text(&self.pkey),
            device: text(&self.device),
            baudrate: text(&self.baudrate),
        }
    }
}
