//! Cooperative delivery channel manager.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as Gate;

use crate::broker::{
    AsyncBrokerChannel, AsyncBrokerClient, AsyncBrokerConnection, BrokerError, ExchangeKind,
};
use crate::diagnostics;

#[derive(Default)]
struct ChannelState {
    connection: Option<Box<dyn AsyncBrokerConnection>>,
    channel: Option<Arc<dyn AsyncBrokerChannel>>,
    exchange_declared: bool,
}

/// Owns the connection/channel pair shared by all in-flight emits.
///
/// A naive "if disconnected, connect" is racy under interleaved emits: two
/// of them can both observe the disconnected state and both dial the
/// broker. The connect gate is a single-slot cooperative mutex closing that
/// race: whoever holds the slot runs the connect sequence, everyone else
/// waits for the holder and then merely re-checks state. The state lock is
/// never held across a suspension point.
pub(crate) struct AsyncDeliveryChannel {
    client: Box<dyn AsyncBrokerClient>,
    uri: String,
    exchange: String,
    connect_gate: Gate<()>,
    state: Mutex<ChannelState>,
}

impl AsyncDeliveryChannel {
    pub(crate) fn new(client: Box<dyn AsyncBrokerClient>, uri: String, exchange: String) -> Self {
        Self {
            client,
            uri,
            exchange,
            connect_gate: Gate::new(()),
            state: Mutex::new(ChannelState::default()),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state.lock().channel.is_some()
    }

    /// Connect lazily with at most one connect sequence in flight. Callers
    /// that lose the gate race re-check state once the holder is done; the
    /// connect has usually already happened for them.
    pub(crate) async fn ensure_connected(&self) -> Result<(), BrokerError> {
        if self.is_connected() {
            return Ok(());
        }
        let _slot = self.connect_gate.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        match self.connect().await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.teardown().await;
                Err(error)
            }
        }
    }

    async fn connect(&self) -> Result<(), BrokerError> {
        let mut connection = self.client.connect(&self.uri).await?;
        let channel: Arc<dyn AsyncBrokerChannel> = Arc::from(connection.open_channel().await?);
        diagnostics::event(format_args!("connected to {}", self.uri));
        let declared = self.state.lock().exchange_declared;
        if !declared {
            channel
                .declare_exchange(&self.exchange, ExchangeKind::Topic, true, false)
                .await?;
        }
        let mut state = self.state.lock();
        state.connection = Some(connection);
        state.channel = Some(channel);
        state.exchange_declared = true;
        Ok(())
    }

    /// Publish with persistent delivery. Requires a connected state; a
    /// failure propagates and the caller must tear down before retrying.
    pub(crate) async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), BrokerError> {
        let channel = self
            .state
            .lock()
            .channel
            .clone()
            .ok_or(BrokerError::NotConnected)?;
        channel.publish(&self.exchange, routing_key, body, true).await
    }

    /// Best-effort close of channel then connection, swallowing close-time
    /// errors and unconditionally returning to the disconnected state.
    pub(crate) async fn teardown(&self) {
        let (connection, channel) = {
            let mut state = self.state.lock();
            state.exchange_declared = false;
            (state.connection.take(), state.channel.take())
        };
        if let Some(channel) = channel {
            let _ = channel.close().await;
        }
        if let Some(mut connection) = connection {
            let _ = connection.close().await;
        }
    }
}
