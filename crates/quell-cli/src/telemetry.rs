use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::{Args, LogLevel};

pub(crate) fn init(args: &Args) {
    let filter = match args.log_level {
        Some(level) => EnvFilter::new(level.filter()),
        None => EnvFilter::try_from_env("QUELL_RUST_LOG").unwrap_or_else(|_| EnvFilter::new(LogLevel::default().filter())),
    };

    tracing_subscriber::registry()
        .with(args.log_format())
        .with(filter)
        .init();
}
