use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Subscriber;
use tracing_subscriber::{registry::LookupSpan, Layer};

mod log;

pub(crate) use self::log::{LogLevel, LogStyle};

#[derive(Debug, Parser)]
#[command(name = "quell", version)]
/// Resolves GraphQL queries through a normalized client-side cache
pub(crate) struct Args {
    /// Path to the TOML configuration file
    #[arg(long, short, env = "QUELL_CONFIG_PATH", default_value = "./quell.toml")]
    pub config: PathBuf,
    /// Set the logging level
    #[arg(long = "log", env = "QUELL_LOG")]
    pub log_level: Option<LogLevel>,
    /// Set the style of log output
    #[arg(long, env = "QUELL_LOG_STYLE", default_value_t = LogStyle::Text)]
    log_style: LogStyle,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Resolve a query and print the response
    Query {
        /// A file containing the query, or `-` to read it from stdin
        file: PathBuf,
        /// The GraphQL endpoint to send queries to. Overrides the configuration
        #[arg(long, short, env = "QUELL_ENDPOINT")]
        endpoint: Option<String>,
        /// Resolve the query this many times, logging the cache status of each run
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
    /// List the keys of every record in the cache
    Keys,
    /// Remove everything from the cache
    Clear,
}

impl Args {
    pub fn log_format<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync,
    {
        // stdout is reserved for responses
        let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        match self.log_style {
            // for interactive terminals we provide colored output
            LogStyle::Text if atty::is(atty::Stream::Stderr) => layer.with_ansi(true).boxed(),
            LogStyle::Text => layer.with_ansi(false).boxed(),
            LogStyle::Json => layer.json().boxed(),
        }
    }
}
