//! Topic-routed log shipping to a message broker.
//!
//! `topiclog` delivers structured log records to a durable topic exchange
//! for centralized aggregation. Each record is flattened into a uniform
//! field mapping, a hierarchical routing key is compiled from configured
//! field paths (`app.logger.LEVEL` by default, with `*` wildcards where a
//! field cannot be resolved), and the field-filtered record is published as
//! UTF-8 JSON with persistent delivery. Connections are established
//! lazily, re-established after failures, and every delivery is retried
//! exactly once before the record is dropped and reported; `emit` never
//! propagates an error into the caller's logging path.
//!
//! Two handler variants share one configuration surface:
//! [`BrokerHandler`] blocks the caller for the duration of delivery, while
//! [`AsyncBrokerHandler`] serves interleaved emits and funnels concurrent
//! connection attempts through a single-flight gate. The broker protocol
//! itself stays behind the [`broker`] trait seams; hosts adapt whatever
//! protocol client they already carry.

pub mod aio;
pub mod blocking;
pub mod broker;
mod config;
mod diagnostics;
mod fields;
mod handler;
mod level;
pub mod log_compat;
mod payload;
mod record;
mod routing;

pub use aio::AsyncBrokerHandler;
pub use blocking::BrokerHandler;
pub use config::{
    BrokerHandlerBuilder, BrokerHandlerConfig, DEFAULT_EXCHANGE, HandlerBuildError,
    MAX_APP_NAME_LEN,
};
pub use fields::{RecordField, UnknownFieldError, default_origin_fields};
pub use handler::{EmitError, Handler};
pub use level::Level;
pub use log_compat::LogBridge;
pub use record::{LogRecord, RecordMetadata};
pub use routing::{MAX_ROUTING_KEY_LEN, RoutingKeyError, RoutingKeySpec};
