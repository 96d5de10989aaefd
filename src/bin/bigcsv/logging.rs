//! Console logging for the CLI.
//!
//! Filtering follows `RUST_LOG`, e.g. `RUST_LOG=bigcsv=debug` to see index
//! summaries and worker activity. Output goes to stderr so it never mixes
//! with rows printed on stdout.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry().with(console_layer).init();
}
