use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Level for this crate's own events given the number of `-v` flags.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Picks exactly one filter. Valid `RUST_LOG` directives replace the `-v`
/// based targets entirely, so they can raise dependencies above warn.
fn filters(verbosity: u8, directives: Option<&str>) -> (Option<Targets>, Option<EnvFilter>) {
    match directives.map(EnvFilter::try_new) {
        Some(Ok(env_filter)) => (None, Some(env_filter)),
        _ => {
            let targets = Targets::new()
                .with_target(env!("CARGO_CRATE_NAME"), level_for(verbosity))
                .with_default(LevelFilter::WARN);
            (Some(targets), None)
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so tables on stdout
/// stay clean.
pub fn init_logging(verbosity: u8) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (app_filter, env_filter) = filters(verbosity, directives.as_deref());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_target(verbosity > 1)
                .with_writer(std::io::stderr),
        )
        .with(app_filter)
        .with(env_filter)
        .init();
}
