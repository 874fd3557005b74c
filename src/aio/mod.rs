//! Cooperative broker handler.
//!
//! This module defines [`AsyncBrokerHandler`], the variant for hosts that
//! emit from async contexts. Many emits may be in flight at once; they
//! interleave only at the broker client's suspension points, and connection
//! establishment is single-flight: concurrent emits that find the handler
//! disconnected coordinate through a one-slot gate so exactly one of them
//! runs the connect sequence.

mod channel;
mod handler;


pub use handler::AsyncBrokerHandler;
