//! Rolling file logs for the register core.
//!
//! # Responsibility
//! - Start the flexi_logger file sink once per process.
//! - Resolve the active level from the shell, `IMSREG_LOG_LEVEL`, or the
//!   build mode.
//! - Keep logged text single-line and bounded (`sanitize_message`).
//!
//! # Invariants
//! - A second `init_logging` with the same level and directory is a no-op.
//! - A second `init_logging` with a different level or directory fails with
//!   `LoggingError::AlreadyInitialized`.
//! - Nothing in this module panics.
//! - Register events carry ids and metadata only (`event=... module=...`).

use crate::db::migrations::latest_version;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Environment variable consulted when the shell passes no level.
pub const LOG_LEVEL_ENV: &str = "IMSREG_LOG_LEVEL";

const LOG_FILE_BASENAME: &str = "imsreg";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Log verbosity accepted by `init_logging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parses a case-insensitive level name; `warning` is accepted for `warn`.
    pub fn parse(value: &str) -> Result<Self, LoggingError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(LoggingError::UnsupportedLevel(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `debug` for debug builds, `info` for release builds.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

/// Logging bootstrap failures.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    InvalidDirectory(String),
    CreateDirectory { path: PathBuf, source: std::io::Error },
    AlreadyInitialized {
        setting: &'static str,
        active: String,
        requested: String,
    },
    Backend(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidDirectory(message) => write!(f, "{message}"),
            Self::CreateDirectory { path, source } => write!(
                f,
                "failed to create log directory `{}`: {source}",
                path.display()
            ),
            Self::AlreadyInitialized {
                setting,
                active,
                requested,
            } => write!(
                f,
                "logging already initialized with {setting} `{active}`; refusing to switch to `{requested}`"
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
        }
    }
}

impl std::error::Error for LoggingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDirectory { source, .. } => Some(source),
            _ => None,
        }
    }
}

struct ActiveLogger {
    level: LogLevel,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn check_same(&self, level: LogLevel, log_dir: &Path) -> Result<(), LoggingError> {
        if self.log_dir != log_dir {
            return Err(LoggingError::AlreadyInitialized {
                setting: "directory",
                active: self.log_dir.display().to_string(),
                requested: log_dir.display().to_string(),
            });
        }
        if self.level != level {
            return Err(LoggingError::AlreadyInitialized {
                setting: "level",
                active: self.level.as_str().to_string(),
                requested: level.as_str().to_string(),
            });
        }
        Ok(())
    }
}

/// Starts file logging under `log_dir` at `level`.
///
/// A blank `level` falls back to `IMSREG_LOG_LEVEL`, then to the build
/// default. `log_dir` must be absolute.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    let env_level = std::env::var(LOG_LEVEL_ENV).ok();
    let level = resolve_level(level, env_level.as_deref())?;
    let log_dir = absolute_log_dir(log_dir)?;

    if let Some(active) = ACTIVE.get() {
        return active.check_same(level, &log_dir);
    }

    let active = ACTIVE.get_or_try_init(|| start_logger(level, &log_dir))?;
    // Another thread may have won the race with different settings.
    active.check_same(level, &log_dir)
}

/// `(level, log_dir)` of the running logger, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.level.as_str(), active.log_dir.clone()))
}

/// Level name used when neither the shell nor the environment picks one.
pub fn default_log_level() -> &'static str {
    LogLevel::for_build().as_str()
}

/// Flattens `value` to one line and caps it at `max_chars` characters.
pub fn sanitize_message(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut capped = flattened.chars().take(max_chars).collect::<String>();
    if flattened.chars().count() > max_chars {
        capped.push_str("...");
    }
    capped
}

fn resolve_level(requested: &str, env_level: Option<&str>) -> Result<LogLevel, LoggingError> {
    if !requested.trim().is_empty() {
        return LogLevel::parse(requested);
    }
    match env_level.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => LogLevel::parse(value),
        None => Ok(LogLevel::for_build()),
    }
}

fn absolute_log_dir(log_dir: &str) -> Result<PathBuf, LoggingError> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err(LoggingError::InvalidDirectory(
            "log_dir cannot be empty".to_string(),
        ));
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(LoggingError::InvalidDirectory(format!(
            "log_dir must be an absolute path, got `{trimmed}`"
        )));
    }
    Ok(path.to_path_buf())
}

fn start_logger(level: LogLevel, log_dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDirectory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::try_with_str(level.as_str())
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        // [YYYY-MM-DD HH:MM:SS.ffffff TZ] LEVEL [module] file:line: message
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();

    info!(
        "event=app_start module=core status=ok platform={} build={} version={}",
        std::env::consts::OS,
        if cfg!(debug_assertions) { "debug" } else { "release" },
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "event=core_init module=core status=ok level={} log_dir={} schema_version={}",
        level.as_str(),
        log_dir.display(),
        latest_version()
    );

    Ok(ActiveLogger {
        level,
        log_dir: log_dir.to_path_buf(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        // Payloads can quote form input.
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=core status=error location={location} payload={}",
            sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous(panic_info);
    }));
}
