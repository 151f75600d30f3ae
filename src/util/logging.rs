//! Subscriber setup for embedding applications

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Map a `-d` count to a level: 0 warn, 1 info, 2 debug, 3+ trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install a stderr `fmt` subscriber at the level for `verbosity`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging(verbosity: u8) {
    let filter = level_for(verbosity);

    let noisy_modules = ["walkdir"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::ENTER)
        .with_span_events(FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    if tracing::dispatcher::has_been_set() {
        tracing::debug!("Tracing subscriber already set");
        return;
    }
    if let Err(e) = tracing_subscriber::registry().with(filtered_layer).try_init() {
        eprintln!("Error: Failed to set up logging: {}", e);
        return;
    }

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }
}
