// Logging setup
//
// Library crates log through the `log` facade; the binary picks where it goes.
// While the console host owns the terminal, log lines would corrupt the
// screen, so they are appended to a file instead of stderr.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};

use crate::config::get_leizi_dir;

/// Filter used when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = "leizi=info";

/// Default log file (~/.leizi/logs/leizi.log)
pub fn default_log_path() -> Result<PathBuf> {
    let log_dir = get_leizi_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
    Ok(log_dir.join("leizi.log"))
}

fn builder() -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} [{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        )
    });
    builder
}

/// Log to stderr, for one-shot commands
pub fn init_stderr() {
    // A second init (e.g. in tests) is harmless
    let _ = builder().target(Target::Stderr).try_init();
}

/// Append logs to `path`, for the full-screen console host
pub fn init_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    builder()
        .target(Target::Pipe(Box::new(file)))
        .try_init()
        .context("Logger already initialized")?;
    Ok(())
}
