//! Rolling file logs for core callers.
//!
//! # Responsibility
//! - Start the file logger once per process from `CoreConfig`.
//! - Report which level and directory are active.
//!
//! # Invariants
//! - Starting twice with the same level and directory is a no-op.
//! - Starting with a different level or directory is rejected.
//! - Events carry identifiers and sizes only; record contents, update bytes
//!   and commit messages are never logged.

use crate::config::CoreConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_FILE_BASENAME: &str = "seedbank";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 4;
const PANIC_SUMMARY_CHARS: usize = 120;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

struct ActiveLogger {
    status: LoggingStatus,
    _handle: LoggerHandle,
}

/// Level and directory of the running file logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingStatus {
    pub level: LevelFilter,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnknownLevel(String),
    RelativeDirectory(PathBuf),
    NonUtf8Directory(PathBuf),
    AlreadyRunning {
        active: LoggingStatus,
        requested: LoggingStatus,
    },
    Backend(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(level) => write!(
                f,
                "unknown log level `{level}`; expected off|error|warn|info|debug|trace"
            ),
            Self::RelativeDirectory(path) => {
                write!(f, "log directory `{}` is not absolute", path.display())
            }
            Self::NonUtf8Directory(path) => {
                write!(f, "log directory `{}` is not valid UTF-8", path.display())
            }
            Self::AlreadyRunning { active, requested } => write!(
                f,
                "logger already running with {} at `{}`; cannot restart with {} at `{}`",
                active.level,
                active.log_dir.display(),
                requested.level,
                requested.log_dir.display()
            ),
            Self::Backend(message) => write!(f, "logger backend: {message}"),
        }
    }
}

impl Error for LoggingError {}

/// Level used when the configuration names none.
pub fn default_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Starts the file logger at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - `UnknownLevel` / `RelativeDirectory` for bad arguments.
/// - `AlreadyRunning` when a logger with other settings is active.
/// - `Backend` when the directory or logger cannot be created.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), LoggingError> {
    let requested = LoggingStatus {
        level: parse_level(level)?,
        log_dir: absolute_dir(log_dir)?,
    };
    let active = ACTIVE.get_or_try_init(|| start(&requested))?;
    if active.status != requested {
        return Err(LoggingError::AlreadyRunning {
            active: active.status.clone(),
            requested,
        });
    }
    Ok(())
}

/// Starts logging when `config.log_dir` is set; `Ok(false)` otherwise.
pub fn init_logging_from(config: &CoreConfig) -> Result<bool, LoggingError> {
    let Some(log_dir) = config.log_dir.as_deref() else {
        return Ok(false);
    };
    if log_dir.to_str().is_none() {
        return Err(LoggingError::NonUtf8Directory(log_dir.to_path_buf()));
    }
    match config.log_level.as_deref() {
        Some(level) => init_logging(level, log_dir)?,
        None => init_logging(&default_log_level().to_string(), log_dir)?,
    }
    Ok(true)
}

/// The running logger's settings, or `None` before `init_logging`.
pub fn logging_status() -> Option<LoggingStatus> {
    ACTIVE.get().map(|active| active.status.clone())
}

fn parse_level(raw: &str) -> Result<LevelFilter, LoggingError> {
    let trimmed = raw.trim();
    let name = if trimmed.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        trimmed
    };
    LevelFilter::from_str(name).map_err(|_| LoggingError::UnknownLevel(trimmed.to_string()))
}

fn absolute_dir(path: &Path) -> Result<PathBuf, LoggingError> {
    if path.as_os_str().is_empty() || !path.is_absolute() {
        return Err(LoggingError::RelativeDirectory(path.to_path_buf()));
    }
    Ok(path.to_path_buf())
}

fn start(status: &LoggingStatus) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&status.log_dir).map_err(|err| {
        LoggingError::Backend(format!("create `{}`: {err}", status.log_dir.display()))
    })?;

    let filter = status.level.to_string().to_ascii_lowercase();
    let handle = Logger::try_with_str(&filter)
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(&status.log_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook();
    info!(
        "event=logging_ready module=core level={} log_dir={} version={}",
        status.level,
        status.log_dir.display(),
        crate::core_version()
    );

    Ok(ActiveLogger {
        status: status.clone(),
        _handle: handle,
    })
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        error!(
            "event=panic module=core location={} summary={}",
            location,
            panic_summary(info.payload(), PANIC_SUMMARY_CHARS)
        );
        previous(info);
    }));
}

// Payloads can quote record text: one line, capped.
fn panic_summary(payload: &(dyn std::any::Any + Send), limit: usize) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= limit {
        return single_line;
    }
    let mut capped: String = single_line.chars().take(limit).collect();
    capped.push_str("...");
    capped
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, init_logging_from, logging_status, panic_summary, parse_level,
        LoggingError,
    };
    use crate::config::CoreConfig;
    use log::LevelFilter;
    use std::path::Path;

    #[test]
    fn levels_parse_case_insensitively_with_warning_alias() {
        assert_eq!(parse_level(" INFO "), Ok(LevelFilter::Info));
        assert_eq!(parse_level("warning"), Ok(LevelFilter::Warn));
        assert_eq!(
            parse_level("verbose"),
            Err(LoggingError::UnknownLevel("verbose".to_string()))
        );
    }

    #[test]
    fn relative_directory_is_rejected() {
        let err = init_logging("info", Path::new("logs/dev")).unwrap_err();
        assert_eq!(err, LoggingError::RelativeDirectory("logs/dev".into()));
    }

    #[test]
    fn config_without_directory_leaves_logging_off() {
        assert_eq!(init_logging_from(&CoreConfig::default()), Ok(false));
    }

    #[test]
    fn panic_summary_is_single_line_and_capped() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("name\nMilho\rverde".to_string());
        assert_eq!(panic_summary(payload.as_ref(), 64), "name Milho verde");
        assert_eq!(panic_summary(payload.as_ref(), 4), "name...");

        let opaque: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_summary(opaque.as_ref(), 64), "non-string payload");
    }

    #[test]
    fn repeated_start_is_idempotent_and_conflicts_are_rejected() {
        let root = std::env::temp_dir().join(format!("seedbank-logging-{}", std::process::id()));
        let log_dir = root.join("logs");

        let config = CoreConfig {
            log_level: Some("info".to_string()),
            log_dir: Some(log_dir.clone()),
            ..CoreConfig::default()
        };
        assert_eq!(init_logging_from(&config), Ok(true));
        init_logging("INFO", &log_dir).unwrap();

        let status = logging_status().unwrap();
        assert_eq!(status.level, LevelFilter::Info);
        assert_eq!(status.log_dir, log_dir);

        let level_conflict = init_logging("debug", &log_dir).unwrap_err();
        assert!(matches!(level_conflict, LoggingError::AlreadyRunning { .. }));
        let dir_conflict = init_logging("info", &root.join("other")).unwrap_err();
        assert!(matches!(dir_conflict, LoggingError::AlreadyRunning { .. }));
    }
}
