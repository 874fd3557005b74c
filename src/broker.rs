//! Broker client collaborator seams.
//!
//! The broker protocol is not implemented here. Handlers drive it through
//! these traits: a client opens connections, a connection opens channels,
//! and a channel declares the exchange and publishes payloads. Blocking and
//! async handlers use the sync and async mirrors of the same surface.
//! Implementations adapt whatever protocol library the host application
//! already carries.

use std::io;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by broker client implementations.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connect(String),
    #[error("failed to open channel: {0}")]
    Channel(String),
    #[error("failed to declare exchange: {0}")]
    Declare(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("not connected to broker")]
    NotConnected,
    #[error("broker i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Exchange kinds a channel can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    Topic,
    Direct,
    Fanout,
}

impl ExchangeKind {
    /// Protocol-level name of the exchange kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeKind::Topic => "topic",
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
        }
    }
}

/// Blocking broker client: opens transport connections from a URI.
pub trait BrokerClient: Send {
    fn connect(&self, uri: &str) -> Result<Box<dyn BrokerConnection>, BrokerError>;
}

/// One open transport connection.
pub trait BrokerConnection: Send {
    fn open_channel(&mut self) -> Result<Box<dyn BrokerChannel>, BrokerError>;

    /// Close the connection. Callers shutting down treat failures here as
    /// best-effort.
    fn close(&mut self) -> Result<(), BrokerError>;
}

/// One open channel on a connection.
pub trait BrokerChannel: Send {
    fn declare_exchange(
        &mut self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
        auto_delete: bool,
    ) -> Result<(), BrokerError>;

    /// Publish `body` to `exchange` under `routing_key`. `persistent` asks
    /// the broker to retain the message across a restart.
    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        persistent: bool,
    ) -> Result<(), BrokerError>;

    fn close(&mut self) -> Result<(), BrokerError>;
}

/// Async mirror of [`BrokerClient`]. Suspension points in the cooperative
/// concurrent mode occur exactly at these calls.
#[async_trait]
pub trait AsyncBrokerClient: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<Box<dyn AsyncBrokerConnection>, BrokerError>;
}

/// Async mirror of [`BrokerConnection`].
#[async_trait]
pub trait AsyncBrokerConnection: Send + Sync {
    async fn open_channel(&mut self) -> Result<Box<dyn AsyncBrokerChannel>, BrokerError>;

    async fn close(&mut self) -> Result<(), BrokerError>;
}

/// Async mirror of [`BrokerChannel`]. Publishing takes `&self` so one
/// channel can serve interleaved emit operations.
#[async_trait]
pub trait AsyncBrokerChannel: Send + Sync {
    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
        auto_delete: bool,
    ) -> Result<(), BrokerError>;

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        persistent: bool,
    ) -> Result<(), BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}
