//! Tests for the blocking handler against a scripted broker stub.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::broker::{
    BrokerChannel, BrokerClient, BrokerConnection, BrokerError, ExchangeKind,
};
use crate::config::{BrokerHandlerBuilder, DEFAULT_EXCHANGE};
use crate::handler::{EmitError, Handler};
use crate::level::Level;
use crate::record::LogRecord;

use super::BrokerHandler;

#[derive(Default)]
struct StubCore {
    connects: AtomicUsize,
    declares: AtomicUsize,
    publishes: AtomicUsize,
    channel_closes: AtomicUsize,
    connection_closes: AtomicUsize,
    failing_connects: Mutex<usize>,
    failing_publishes: Mutex<usize>,
    declared: Mutex<Vec<(String, &'static str, bool, bool)>>,
    published: Mutex<Vec<(String, String, Vec<u8>, bool)>>,
}

impl StubCore {
    fn fail_next_connects(&self, count: usize) {
        *self.failing_connects.lock() = count;
    }

    fn fail_next_publishes(&self, count: usize) {
        *self.failing_publishes.lock() = count;
    }
}

struct StubClient(Arc<StubCore>);

impl BrokerClient for StubClient {
    fn connect(&self, _uri: &str) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        let mut failing = self.0.failing_connects.lock();
        if *failing > 0 {
            *failing -= 1;
            return Err(BrokerError::Connect("stub refused connection".into()));
        }
        Ok(Box::new(StubConnection(self.0.clone())))
    }
}

struct StubConnection(Arc<StubCore>);

impl BrokerConnection for StubConnection {
    fn open_channel(&mut self) -> Result<Box<dyn BrokerChannel>, BrokerError> {
        Ok(Box::new(StubChannel(self.0.clone())))
    }

    fn close(&mut self) -> Result<(), BrokerError> {
        self.0.connection_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct StubChannel(Arc<StubCore>);

impl BrokerChannel for StubChannel {
    fn declare_exchange(
        &mut self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
        auto_delete: bool,
    ) -> Result<(), BrokerError> {
        self.0.declares.fetch_add(1, Ordering::SeqCst);
        self.0
            .declared
            .lock()
            .push((name.to_owned(), kind.as_str(), durable, auto_delete));
        Ok(())
    }

    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        persistent: bool,
    ) -> Result<(), BrokerError> {
        self.0.publishes.fetch_add(1, Ordering::SeqCst);
        let mut failing = self.0.failing_publishes.lock();
        if *failing > 0 {
            *failing -= 1;
            return Err(BrokerError::Publish("stub channel dropped".into()));
        }
        self.0.published.lock().push((
            exchange.to_owned(),
            routing_key.to_owned(),
            body.to_vec(),
            persistent,
        ));
        Ok(())
    }

    fn close(&mut self) -> Result<(), BrokerError> {
        self.0.channel_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[fixture]
fn core() -> Arc<StubCore> {
    Arc::default()
}

fn handler_over(core: &Arc<StubCore>) -> BrokerHandler {
    BrokerHandlerBuilder::new("svc", "amqp://stub")
        .build(Box::new(StubClient(core.clone())))
        .expect("build handler")
}

fn error_record() -> LogRecord {
    LogRecord::new("worker", Level::Error, "boom")
}

#[rstest]
fn first_emit_connects_declares_and_publishes(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    handler.emit(&error_record());

    assert_eq!(core.connects.load(Ordering::SeqCst), 1);
    assert_eq!(core.declares.load(Ordering::SeqCst), 1);
    assert_eq!(core.publishes.load(Ordering::SeqCst), 1);
    assert_eq!(
        core.declared.lock()[0],
        (DEFAULT_EXCHANGE.to_owned(), "topic", true, false)
    );

    let published = core.published.lock();
    let (exchange, routing_key, body, persistent) = &published[0];
    assert_eq!(exchange, DEFAULT_EXCHANGE);
    assert_eq!(routing_key, "svc.worker.ERROR");
    assert!(*persistent);

    let decoded: Value = serde_json::from_slice(body).expect("payload is json");
    let object = decoded.as_object().expect("payload is an object");
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["asctime", "message", "name", "process"]);
    assert_eq!(object["name"], json!("worker"));
    assert_eq!(object["message"], json!("boom"));
}

#[rstest]
fn connection_is_reused_across_emits(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    handler.emit(&error_record());
    handler.emit(&error_record());

    assert_eq!(core.connects.load(Ordering::SeqCst), 1);
    assert_eq!(core.declares.load(Ordering::SeqCst), 1);
    assert_eq!(core.publishes.load(Ordering::SeqCst), 2);
}

#[rstest]
fn publish_failure_is_retried_once_after_teardown(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    core.fail_next_publishes(1);
    handler.emit(&error_record());

    assert_eq!(core.publishes.load(Ordering::SeqCst), 2);
    assert_eq!(core.connects.load(Ordering::SeqCst), 2);
    assert_eq!(core.channel_closes.load(Ordering::SeqCst), 1);
    assert_eq!(core.connection_closes.load(Ordering::SeqCst), 1);
    assert_eq!(handler.dropped_records(), 0);
}

#[rstest]
fn exchange_is_redeclared_after_reconnect(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    core.fail_next_publishes(1);
    handler.emit(&error_record());

    assert_eq!(core.declares.load(Ordering::SeqCst), 2);
}

#[rstest]
fn second_failure_drops_the_record_without_a_third_attempt(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    core.fail_next_publishes(2);
    handler.emit(&error_record());

    assert_eq!(core.publishes.load(Ordering::SeqCst), 2);
    assert_eq!(handler.dropped_records(), 1);
    // Teardown after each failed attempt.
    assert_eq!(core.channel_closes.load(Ordering::SeqCst), 2);
    assert_eq!(core.connection_closes.load(Ordering::SeqCst), 2);

    // A later emit recovers on a fresh connection.
    handler.emit(&error_record());
    assert_eq!(core.publishes.load(Ordering::SeqCst), 3);
    assert_eq!(handler.dropped_records(), 1);
}

#[rstest]
fn try_emit_surfaces_the_terminal_error(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    core.fail_next_publishes(2);
    let error = handler
        .try_emit(&error_record())
        .expect_err("both attempts fail");
    assert!(matches!(error, EmitError::Broker(BrokerError::Publish(_))));
}

#[rstest]
fn connect_failure_is_retried_like_a_publish_failure(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    core.fail_next_connects(1);
    handler.emit(&error_record());

    assert_eq!(core.connects.load(Ordering::SeqCst), 2);
    assert_eq!(core.publishes.load(Ordering::SeqCst), 1);
    assert_eq!(handler.dropped_records(), 0);
}

#[rstest]
fn repeated_connect_failure_drops_without_publishing(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    core.fail_next_connects(2);
    handler.emit(&error_record());

    assert_eq!(core.connects.load(Ordering::SeqCst), 2);
    assert_eq!(core.publishes.load(Ordering::SeqCst), 0);
    assert_eq!(handler.dropped_records(), 1);
}

#[rstest]
fn records_below_minimum_level_never_touch_the_broker(core: Arc<StubCore>) {
    let handler = BrokerHandlerBuilder::new("svc", "amqp://stub")
        .with_level(Level::Warn)
        .build(Box::new(StubClient(core.clone())))
        .expect("build handler");
    handler.emit(&LogRecord::new("worker", Level::Info, "chatty"));

    assert_eq!(core.connects.load(Ordering::SeqCst), 0);
    assert_eq!(core.publishes.load(Ordering::SeqCst), 0);
}

#[rstest]
fn eager_connect_is_reused_by_the_first_emit(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    handler.connect().expect("eager connect");
    handler.emit(&error_record());

    assert_eq!(core.connects.load(Ordering::SeqCst), 1);
    assert_eq!(core.publishes.load(Ordering::SeqCst), 1);
}

#[rstest]
fn close_tears_down_and_later_emits_reconnect(core: Arc<StubCore>) {
    let handler = handler_over(&core);
    handler.connect().expect("eager connect");
    Handler::close(&handler);

    assert_eq!(core.channel_closes.load(Ordering::SeqCst), 1);
    assert_eq!(core.connection_closes.load(Ordering::SeqCst), 1);

    handler.emit(&error_record());
    assert_eq!(core.connects.load(Ordering::SeqCst), 2);
    assert_eq!(core.publishes.load(Ordering::SeqCst), 1);
}

#[rstest]
fn routing_key_and_payload_follow_the_configured_fields(core: Arc<StubCore>) {
    let handler = BrokerHandlerBuilder::new("svc", "amqp://stub")
        .with_fields(["name", "levelname"])
        .with_routing_key(["name", "message.kind"])
        .build(Box::new(StubClient(core.clone())))
        .expect("build handler");
    let record = LogRecord::new("worker", Level::Info, json!({"kind": "audit"}));
    handler.emit(&record);

    let published = core.published.lock();
    let (_, routing_key, body, _) = &published[0];
    assert_eq!(routing_key, "svc.worker.audit");
    let decoded: Value = serde_json::from_slice(body).expect("payload is json");
    assert_eq!(decoded, json!({"name": "worker", "levelname": "INFO"}));
}
