use std::env;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Filter directive; `-v`/`-q` win over `TRACING_LEVEL`.
    fn filter(self) -> String {
        match self {
            Verbosity::Quiet => "error".to_string(),
            Verbosity::Verbose => "debug".to_string(),
            Verbosity::Normal => env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

pub fn init_logger(verbosity: Verbosity) -> impl Drop {
    let filter_layer = EnvFilter::new(verbosity.filter());

    let log_file_path =
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| "./logs/dry.log".to_string());

    let file_appender = tracing_appender::rolling::never("./", log_file_path);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .with(filter_layer)
        .init();

    debug!("Tracing is configured for stdout and file logging.");

    guard
}
