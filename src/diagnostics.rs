//! Timestamped diagnostics for connection and delivery events.
//!
//! The handlers in this crate are themselves log sinks, so their own
//! diagnostics go straight to the standard streams instead of through the
//! `log` facade; routing them through the facade would feed them back into
//! the handler when it is installed as the `log` backend. Output here is
//! observational only and not part of the data contract.

use std::error::Error;
use std::fmt::Display;
use std::io::{self, Write};

use chrono::Local;

const TAG: &str = "topiclog";

fn stamp() -> impl Display {
    Local::now().format("%Y-%m-%d %H:%M:%S")
}

/// Write one informational event line to stdout.
pub(crate) fn event(message: impl Display) {
    let _ = writeln!(io::stdout(), "{} - [{TAG}] {message}", stamp());
}

/// Report a record that delivery ultimately dropped, with the full error
/// source chain, on stderr.
pub(crate) fn record_dropped(logger: &str, error: &(dyn Error + 'static)) {
    let mut out = io::stderr().lock();
    let _ = writeln!(
        out,
        "{} - [{TAG}] delivery failed for record from logger {logger:?}; record dropped: {error}",
        stamp(),
    );
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = writeln!(out, "  caused by: {cause}");
        source = cause.source();
    }
}
