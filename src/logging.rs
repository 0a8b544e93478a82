use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::time::uptime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_NAME: &str = "levantine.log";

/// Overrides the console filter, e.g. `LEVANTINE_LOG=levantine_translate::matcher=trace`.
const CONSOLE_FILTER_ENV: &str = "LEVANTINE_LOG";

/// Everything goes to the file except chatty HTTP internals.
const FILE_FILTER: &str = "trace,reqwest=debug,hyper=info,hyper_util=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    /// `--quiet` wins over `--verbose`.
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn console_directives(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn,levantine_translate=info,levantine=info",
            Verbosity::Verbose => "debug,levantine_translate=trace",
        }
    }
}

/// Install the global subscriber: compact console output on stderr, plus
/// a daily-rolling file under `~/.cache/levantine/logs/` when it can be
/// opened. Keep the returned guard alive until exit or buffered file
/// lines are lost.
pub fn init(verbosity: Verbosity, log_file_override: Option<&PathBuf>) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_env(CONSOLE_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity.console_directives()));

    // stdout is reserved for translations and JSON
    let console_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let Some((writer, guard)) = file_writer(log_file_override) else {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(uptime())
        .with_thread_ids(true)
        .with_target(true)
        .with_filter(EnvFilter::new(FILE_FILTER));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Some(guard)
}

fn file_writer(override_path: Option<&PathBuf>) -> Option<(NonBlocking, WorkerGuard)> {
    let (dir, file_name) = log_target(override_path.map(PathBuf::as_path), dirs::cache_dir())?;
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(&dir, &file_name);
    Some(tracing_appender::non_blocking(appender))
}

/// Directory and base file name for the rolling log.
fn log_target(override_path: Option<&Path>, cache_dir: Option<PathBuf>) -> Option<(PathBuf, String)> {
    match override_path {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            let name = path
                .file_name()
                .map_or_else(|| LOG_FILE_NAME.to_string(), |n| n.to_string_lossy().into_owned());
            Some((dir, name))
        }
        None => Some((
            cache_dir?.join("levantine").join("logs"),
            LOG_FILE_NAME.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_beats_verbose() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn default_target_is_under_cache_dir() {
        let (dir, name) = log_target(None, Some(PathBuf::from("/tmp/cache"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/cache/levantine/logs"));
        assert_eq!(name, "levantine.log");

        assert!(log_target(None, None).is_none());
    }

    #[test]
    fn override_splits_dir_and_name() {
        let (dir, name) = log_target(Some(Path::new("/var/log/lev/run.log")), None).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/lev"));
        assert_eq!(name, "run.log");

        let (dir, name) = log_target(Some(Path::new("run.log")), None).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "run.log");
    }
}
