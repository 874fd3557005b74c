//! Public cooperative handler type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

use crate::broker::{AsyncBrokerClient, BrokerError};
use crate::config::BrokerHandlerConfig;
use crate::diagnostics;
use crate::handler::EmitError;
use crate::payload;
use crate::record::LogRecord;

use super::channel::AsyncDeliveryChannel;

/// Handler publishing records to a topic exchange from async contexts.
///
/// `emit` suspends only at the broker client's I/O operations; concurrent
/// emits coordinate connection setup through the channel manager's
/// single-slot gate and otherwise proceed independently, so no ordering is
/// guaranteed between two concurrently emitted records.
pub struct AsyncBrokerHandler {
    config: BrokerHandlerConfig,
    channel: AsyncDeliveryChannel,
    dropped: AtomicU64,
}

impl AsyncBrokerHandler {
    pub(crate) fn from_parts(
        config: BrokerHandlerConfig,
        client: Box<dyn AsyncBrokerClient>,
    ) -> Self {
        let channel =
            AsyncDeliveryChannel::new(client, config.uri.clone(), config.exchange.clone());
        Self {
            config,
            channel,
            dropped: AtomicU64::new(0),
        }
    }

    /// Establish the broker connection up front so the first emit does not
    /// pay connect latency. Lazy connection remains the default; this is
    /// optional.
    pub async fn connect(&self) -> Result<(), BrokerError> {
        self.channel.ensure_connected().await
    }

    /// Number of records dropped because delivery failed twice.
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Deliver one record, absorbing any failure. Records below the
    /// configured minimum level are ignored.
    pub async fn emit(&self, record: &LogRecord) {
        if record.level < self.config.level {
            return;
        }
        if let Err(error) = self.try_emit(record).await {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            diagnostics::record_dropped(&record.logger, &error);
        }
    }

    /// Run the delivery sequence for one record, retrying once after a
    /// teardown, and surface the terminal error instead of absorbing it.
    pub async fn try_emit(&self, record: &LogRecord) -> Result<(), EmitError> {
        let normalized = record.normalize();
        match self.deliver(&normalized).await {
            Ok(()) => Ok(()),
            Err(first) => {
                diagnostics::event(format_args!("delivery failed, retrying once: {first}"));
                self.channel.teardown().await;
                match self.deliver(&normalized).await {
                    Ok(()) => Ok(()),
                    Err(second) => {
                        self.channel.teardown().await;
                        Err(second)
                    }
                }
            }
        }
    }

    async fn deliver(&self, normalized: &Map<String, Value>) -> Result<(), EmitError> {
        self.channel.ensure_connected().await?;
        let routing_key = self
            .config
            .routing_key
            .compile(&self.config.app_name, normalized);
        let body = payload::encode(normalized, &self.config.origin_fields)?;
        self.channel.publish(&routing_key, &body).await?;
        Ok(())
    }

    /// Tear down the broker connection. A later emit reconnects lazily.
    pub async fn close(&self) {
        self.channel.teardown().await;
    }
}

impl fmt::Debug for AsyncBrokerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncBrokerHandler")
            .field("app_name", &self.config.app_name)
            .field("exchange", &self.config.exchange)
            .finish()
    }
}
