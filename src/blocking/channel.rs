//! Blocking delivery channel manager.

use crate::broker::{BrokerChannel, BrokerClient, BrokerConnection, BrokerError, ExchangeKind};
use crate::diagnostics;

/// Owns the connection/channel pair for one handler.
///
/// The pair moves between disconnected and connected as a unit: a failure
/// at any step discards both, never leaving a half-torn-down state. The
/// exchange is declared once per physical connection; the declared flag is
/// reset on teardown so a reconnect re-declares it, since the fresh
/// connection may target a broker that has not seen the declaration.
pub(crate) struct DeliveryChannel {
    client: Box<dyn BrokerClient>,
    uri: String,
    exchange: String,
    connection: Option<Box<dyn BrokerConnection>>,
    channel: Option<Box<dyn BrokerChannel>>,
    exchange_declared: bool,
}

impl DeliveryChannel {
    pub(crate) fn new(client: Box<dyn BrokerClient>, uri: String, exchange: String) -> Self {
        Self {
            client,
            uri,
            exchange,
            connection: None,
            channel: None,
            exchange_declared: false,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Connect lazily; a no-op when already connected. On failure the
    /// partial state is torn down and the error propagates.
    pub(crate) fn ensure_connected(&mut self) -> Result<(), BrokerError> {
        if self.is_connected() {
            return Ok(());
        }
        match self.connect() {
            Ok(()) => Ok(()),
            Err(error) => {
                self.teardown();
                Err(error)
            }
        }
    }

    fn connect(&mut self) -> Result<(), BrokerError> {
        let mut connection = self.client.connect(&self.uri)?;
        let mut channel = connection.open_channel()?;
        diagnostics::event(format_args!("connected to {}", self.uri));
        if !self.exchange_declared {
            channel.declare_exchange(&self.exchange, ExchangeKind::Topic, true, false)?;
            self.exchange_declared = true;
        }
        self.connection = Some(connection);
        self.channel = Some(channel);
        Ok(())
    }

    /// Publish with persistent delivery. Requires a connected state; a
    /// failure propagates and the caller must tear down before retrying.
    pub(crate) fn publish(&mut self, routing_key: &str, body: &[u8]) -> Result<(), BrokerError> {
        let channel = self.channel.as_mut().ok_or(BrokerError::NotConnected)?;
        channel.publish(&self.exchange, routing_key, body, true)
    }

    /// Best-effort close of channel then connection, swallowing close-time
    /// errors and unconditionally returning to the disconnected state.
    pub(crate) fn teardown(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            let _ = channel.close();
        }
        if let Some(mut connection) = self.connection.take() {
            let _ = connection.close();
        }
        self.exchange_declared = false;
    }
}
