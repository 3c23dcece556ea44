use serde::{Deserialize, Serialize};
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{
    fmt::{format::Writer, time::FormatTime},
    EnvFilter,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: String,
    /// `(directory, file name prefix)` of a daily rolling log file; stdout when unset.
    pub rolling_file: Option<(String, String)>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            rolling_file: Default::default(),
        }
    }
}

pub fn init_log_filter(filter: &str) -> Result<(), SetGlobalDefaultError> {
    init_log(LogConfig {
        filter: filter.to_owned(),
        ..Default::default()
    })
}

pub fn init_log_file(
    filter: &str,
    directory: &str,
    file_name_prefix: &str,
) -> Result<(), SetGlobalDefaultError> {
    init_log(LogConfig {
        filter: filter.to_owned(),
        rolling_file: Some((directory.to_owned(), file_name_prefix.to_owned())),
    })
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%m-%d %T%.3f"))
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_log(config: LogConfig) -> Result<(), SetGlobalDefaultError> {
    let builder = tracing_subscriber::fmt()
        .compact()
        .with_timer(LocalTimer)
        .with_thread_ids(true)
        .with_env_filter(EnvFilter::new(&config.filter));

    match &config.rolling_file {
        Some((directory, file_name_prefix)) => {
            let logfile = tracing_appender::rolling::daily(directory, file_name_prefix);
            tracing::subscriber::set_global_default(
                builder.with_ansi(false).with_writer(logfile).finish(),
            )
        }
        None => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stdout).finish(),
        ),
    }
}
