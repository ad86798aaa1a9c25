//! Logging setup: always to a file, optionally to stderr.
//!
//! The terminal host owns stdout, so logs go to a file by default.
//!
//! ## Environment Variables
//!
//! 1. **`GITGUTTER_LOG`** (highest priority) - crate-level shorthand
//!    (`GITGUTTER_LOG=debug`) or a full filter directive
//! 2. **`RUST_LOG`** - standard tracing filter
//! 3. **Default** - `warn` globally, `info` for gitgutter
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/gitgutter/logs/gitgutter-<pid>.log`.
//! Override with `--log-file <path>`.

use std::env;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Returned from [`init`]; hold it to keep the file writer flushing.
#[derive(Debug)]
pub struct LogGuard {
    _file_guard: WorkerGuard,
    /// File receiving the logs.
    pub log_file: PathBuf,
}

/// Logging options.
#[derive(Debug, Default)]
pub struct LogConfig {
    /// File (or directory) to log into instead of the default location.
    pub log_file_path: Option<PathBuf>,
    /// Also log to stderr. Only sensible when no TUI is running.
    pub stderr: bool,
}

/// Initialize logging.
///
/// Errors if a global subscriber is already installed.
pub fn init(config: LogConfig) -> Result<LogGuard, BoxError> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_filter());

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(create_filter())
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize logging for tests. Safe to call repeatedly.
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("gitgutter-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir, name);
        }
        return (path, filename);
    }

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gitgutter")
        .join("logs");
    (dir, filename)
}

/// Filter from `GITGUTTER_LOG`, then `RUST_LOG`, then the default.
fn create_filter() -> EnvFilter {
    if let Ok(value) = env::var("GITGUTTER_LOG") {
        return expand_crate_log(&value);
    }
    if let Ok(value) = env::var("RUST_LOG") {
        return EnvFilter::new(value);
    }
    EnvFilter::new("warn,gitgutter=info")
}

/// `GITGUTTER_LOG=debug` means `warn,gitgutter=debug`; anything with
/// directive syntax is used as-is.
fn expand_crate_log(value: &str) -> EnvFilter {
    if value.contains('=') || value.contains(',') || value.contains(':') {
        return EnvFilter::new(value);
    }
    EnvFilter::new(format!("warn,gitgutter={value},metrics={value}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_is_split_into_dir_and_name() {
        let (dir, name) = resolve_log_path(Some(PathBuf::from("/tmp/logs/run.log")));
        assert_eq!(dir, PathBuf::from("/tmp/logs"));
        assert_eq!(name, "run.log");
    }

    #[test]
    fn bare_file_name_logs_to_cwd() {
        let (dir, name) = resolve_log_path(Some(PathBuf::from("run.log")));
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "run.log");
    }

    #[test]
    fn directory_override_keeps_default_name() {
        let (dir, name) = resolve_log_path(Some(PathBuf::from("/tmp/logs")));
        assert_eq!(dir, PathBuf::from("/tmp/logs"));
        assert!(name.starts_with("gitgutter-") && name.ends_with(".log"));
    }

    #[test]
    fn shorthand_expands() {
        let filter = expand_crate_log("debug").to_string();
        assert!(filter.contains("gitgutter=debug"));
        assert_eq!(expand_crate_log("gitgutter=trace").to_string(), "gitgutter=trace");
    }
}
