//! Blocking broker handler.
//!
//! This module defines [`BrokerHandler`], the strictly sequential handler
//! variant: `emit` runs the full normalize/connect/publish sequence,
//! including the single retry, before returning to the caller. The channel
//! manager lives behind a mutex, so concurrent callers queue up rather
//! than interleave.

mod channel;
mod handler;

#[cfg(test)]
mod tests;

pub use handler::BrokerHandler;
