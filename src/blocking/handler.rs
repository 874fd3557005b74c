//! Public blocking handler type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::broker::{BrokerClient, BrokerError};
use crate::config::BrokerHandlerConfig;
use crate::diagnostics;
use crate::handler::{EmitError, Handler};
use crate::payload;
use crate::record::LogRecord;

use super::channel::DeliveryChannel;

/// Handler publishing records to a topic exchange, blocking the caller for
/// the duration of delivery.
pub struct BrokerHandler {
    config: BrokerHandlerConfig,
    channel: Mutex<DeliveryChannel>,
    dropped: AtomicU64,
}

impl BrokerHandler {
    pub(crate) fn from_parts(config: BrokerHandlerConfig, client: Box<dyn BrokerClient>) -> Self {
        let channel = DeliveryChannel::new(client, config.uri.clone(), config.exchange.clone());
        Self {
            config,
            channel: Mutex::new(channel),
            dropped: AtomicU64::new(0),
        }
    }

    /// Establish the broker connection up front so the first emit does not
    /// pay connect latency. Lazy connection remains the default; this is
    /// optional.
    pub fn connect(&self) -> Result<(), BrokerError> {
        self.channel.lock().ensure_connected()
    }

    /// Number of records dropped because delivery failed twice.
    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Run the delivery sequence for one record, retrying once after a
    /// teardown, and surface the terminal error instead of absorbing it.
    pub fn try_emit(&self, record: &LogRecord) -> Result<(), EmitError> {
        let mut channel = self.channel.lock();
        let normalized = record.normalize();
        match self.deliver(&mut channel, &normalized) {
            Ok(()) => Ok(()),
            Err(first) => {
                diagnostics::event(format_args!("delivery failed, retrying once: {first}"));
                channel.teardown();
                match self.deliver(&mut channel, &normalized) {
                    Ok(()) => Ok(()),
                    Err(second) => {
                        channel.teardown();
                        Err(second)
                    }
                }
            }
        }
    }

    fn deliver(
        &self,
        channel: &mut DeliveryChannel,
        normalized: &Map<String, Value>,
    ) -> Result<(), EmitError> {
        channel.ensure_connected()?;
        let routing_key = self
            .config
            .routing_key
            .compile(&self.config.app_name, normalized);
        let body = payload::encode(normalized, &self.config.origin_fields)?;
        channel.publish(&routing_key, &body)?;
        Ok(())
    }

    /// Tear down the broker connection. A later emit reconnects lazily.
    pub fn close(&self) {
        self.channel.lock().teardown();
    }
}

impl Handler for BrokerHandler {
    fn emit(&self, record: &LogRecord) {
        if record.level < self.config.level {
            return;
        }
        if let Err(error) = self.try_emit(record) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            diagnostics::record_dropped(&record.logger, &error);
        }
    }

    fn close(&self) {
        BrokerHandler::close(self);
    }
}

impl Drop for BrokerHandler {
    fn drop(&mut self) {
        self.channel.lock().teardown();
    }
}

impl fmt::Debug for BrokerHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerHandler")
            .field("app_name", &self.config.app_name)
            .field("exchange", &self.config.exchange)
            .finish()
    }
}
