//! Tracing setup. Stdout carries the IPC protocol, so logs go to stderr.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Reads `SCHOOLD_LOG` (e.g. `SCHOOLD_LOG=schoold=debug`), falling back to
/// `schoold=info`. Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("SCHOOLD_LOG")
            .unwrap_or_else(|_| EnvFilter::new("schoold=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
