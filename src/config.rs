//! Handler configuration and construction.
//!
//! `BrokerHandlerBuilder` is the single construction path for both handler
//! variants. All configuration errors are raised here, synchronously, so a
//! handler that builds successfully can never fail for configuration
//! reasons later.

use thiserror::Error;

use crate::aio::AsyncBrokerHandler;
use crate::blocking::BrokerHandler;
use crate::broker::{AsyncBrokerClient, BrokerClient};
use crate::fields::{self, RecordField, UnknownFieldError};
use crate::level::Level;
use crate::routing::{RoutingKeyError, RoutingKeySpec};

/// Exchange the handler declares when none is configured.
pub const DEFAULT_EXCHANGE: &str = "topiclog.logging";

/// Longest application name accepted.
pub const MAX_APP_NAME_LEN: usize = 100;

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// An origin-field name outside the closed field set.
    #[error(transparent)]
    UnknownField(#[from] UnknownFieldError),
    /// A structurally invalid routing-key field-path list.
    #[error(transparent)]
    RoutingKey(#[from] RoutingKeyError),
}

/// Validated configuration shared by both handler variants.
#[derive(Clone, Debug)]
pub struct BrokerHandlerConfig {
    pub(crate) app_name: String,
    pub(crate) uri: String,
    pub(crate) exchange: String,
    pub(crate) origin_fields: Vec<RecordField>,
    pub(crate) level: Level,
    pub(crate) routing_key: RoutingKeySpec,
}

/// Builder for broker-backed log handlers.
#[derive(Clone, Debug)]
pub struct BrokerHandlerBuilder {
    app_name: String,
    uri: String,
    exchange: String,
    fields: Option<Vec<String>>,
    level: Level,
    routing_key: Option<Vec<String>>,
}

impl BrokerHandlerBuilder {
    /// Start a builder for `app_name`, delivering to the broker at `uri`.
    pub fn new(app_name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            uri: uri.into(),
            exchange: DEFAULT_EXCHANGE.to_owned(),
            fields: None,
            level: Level::Trace,
            routing_key: None,
        }
    }

    /// Override the topic exchange name.
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    /// Choose the origin fields included in the wire payload. Duplicates
    /// are removed; the first occurrence fixes the field's position.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Minimum severity delivered; records below it are ignored.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Choose the field paths the routing key is compiled from.
    pub fn with_routing_key<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routing_key = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Validate the configuration without constructing a handler.
    pub fn build_config(&self) -> Result<BrokerHandlerConfig, HandlerBuildError> {
        if self.app_name.chars().count() > MAX_APP_NAME_LEN {
            return Err(HandlerBuildError::InvalidConfig(format!(
                "application name exceeds {MAX_APP_NAME_LEN} characters"
            )));
        }
        let origin_fields = match &self.fields {
            None => fields::default_origin_fields(),
            Some(names) => {
                let mut parsed = Vec::with_capacity(names.len());
                for name in names {
                    let field: RecordField = name.parse()?;
                    if !parsed.contains(&field) {
                        parsed.push(field);
                    }
                }
                parsed
            }
        };
        let routing_key = match &self.routing_key {
            None => RoutingKeySpec::default_spec(),
            Some(paths) => RoutingKeySpec::new(paths.iter().cloned())?,
        };
        Ok(BrokerHandlerConfig {
            app_name: self.app_name.clone(),
            uri: self.uri.clone(),
            exchange: self.exchange.clone(),
            origin_fields,
            level: self.level,
            routing_key,
        })
    }

    /// Build the blocking handler over the given broker client.
    pub fn build(
        self,
        client: Box<dyn BrokerClient>,
    ) -> Result<BrokerHandler, HandlerBuildError> {
        Ok(BrokerHandler::from_parts(self.build_config()?, client))
    }

    /// Build the cooperative (async) handler over the given broker client.
    pub fn build_async(
        self,
        client: Box<dyn AsyncBrokerClient>,
    ) -> Result<AsyncBrokerHandler, HandlerBuildError> {
        Ok(AsyncBrokerHandler::from_parts(self.build_config()?, client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn builder() -> BrokerHandlerBuilder {
        BrokerHandlerBuilder::new("svc", "amqp://localhost:5672/%2f")
    }

    #[rstest]
    fn defaults_mirror_the_documented_configuration() {
        let config = builder().build_config().expect("valid defaults");
        assert_eq!(config.exchange, DEFAULT_EXCHANGE);
        assert_eq!(config.level, Level::Trace);
        assert_eq!(config.origin_fields, fields::default_origin_fields());
        assert_eq!(config.routing_key.paths(), ["name", "levelname"]);
    }

    #[rstest]
    fn accepts_app_name_at_the_limit() {
        let name = "a".repeat(MAX_APP_NAME_LEN);
        assert!(BrokerHandlerBuilder::new(name, "amqp://h").build_config().is_ok());
    }

    #[rstest]
    fn rejects_over_long_app_name() {
        let name = "a".repeat(MAX_APP_NAME_LEN + 1);
        let err = BrokerHandlerBuilder::new(name, "amqp://h")
            .build_config()
            .expect_err("name must be rejected");
        assert!(matches!(err, HandlerBuildError::InvalidConfig(msg) if msg.contains("100")));
    }

    #[rstest]
    fn rejects_unknown_origin_field() {
        let err = builder()
            .with_fields(["name", "severity"])
            .build_config()
            .expect_err("unknown field must be rejected");
        assert!(matches!(err, HandlerBuildError::UnknownField(UnknownFieldError(name)) if name == "severity"));
    }

    #[rstest]
    fn deduplicates_origin_fields_keeping_first_position() {
        let config = builder()
            .with_fields(["message", "name", "msg"])
            .build_config()
            .expect("valid fields");
        assert_eq!(config.origin_fields, [RecordField::Message, RecordField::Name]);
    }

    #[rstest]
    fn rejects_empty_routing_key() {
        let err = builder()
            .with_routing_key(Vec::<String>::new())
            .build_config()
            .expect_err("empty routing key must be rejected");
        assert!(matches!(err, HandlerBuildError::RoutingKey(RoutingKeyError::Empty)));
    }

    #[rstest]
    fn rejects_whole_message_routing_path_but_not_sub_fields() {
        let err = builder()
            .with_routing_key(["message"])
            .build_config()
            .expect_err("whole message path must be rejected");
        assert!(matches!(
            err,
            HandlerBuildError::RoutingKey(RoutingKeyError::MessageAsPath)
        ));
        assert!(builder().with_routing_key(["message.kind"]).build_config().is_ok());
    }
}
