use std::fmt;

use clap::ValueEnum;

/// The log targets `--log` controls.  The binary is named `quell`, so its own events share a
/// target with the core crate.
const TARGETS: [&str; 2] = ["quell", "quell_local"];

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogLevel {
    /// No logs at all
    Off,
    Error,
    /// Warnings, including failed cache writes
    #[default]
    Warn,
    /// The cache status & duration of each query
    Info,
    /// Also the queries sent to the server, and what was read from the cache
    Debug,
    /// Everything, including logs from dependencies
    Trace,
}

impl LogLevel {
    /// Filter directives enabling our own crates at this level and silencing everything else
    pub(crate) fn filter(self) -> String {
        let level = match self {
            LogLevel::Off => return "off".to_string(),
            LogLevel::Trace => return "trace".to_string(),
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };

        let mut directives = TARGETS.map(|name| format!("{name}={level}")).join(",");
        directives.push_str(",off");
        directives
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogStyle {
    /// Human readable lines
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStyle::Text => f.write_str("text"),
            LogStyle::Json => f.write_str("json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_cover_every_crate() {
        assert_eq!(LogLevel::Info.filter(), "quell=info,quell_local=info,off");
        assert_eq!(LogLevel::default().filter(), "quell=warn,quell_local=warn,off");
        assert_eq!(LogLevel::Off.filter(), "off");
        assert_eq!(LogLevel::Trace.filter(), "trace");
    }
}
