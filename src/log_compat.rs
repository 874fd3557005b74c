//! Compatibility bridge for the Rust `log` crate.
//!
//! `LogBridge` implements `log::Log` over any [`Handler`], so applications
//! already instrumented with the `log` macros can ship their records to the
//! broker without touching call sites. `::`-separated targets are
//! normalised to dotted logger names, which keeps them meaningful as topic
//! routing key segments.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use log::{Metadata, Record};
use serde_json::Value;

use crate::handler::Handler;
use crate::level::Level;
use crate::record::{LogRecord, RecordMetadata};

/// Adapter implementing the `log::Log` trait.
pub struct LogBridge {
    handler: Arc<dyn Handler>,
    max_level: log::LevelFilter,
}

fn map_level(level: log::Level) -> Level {
    match level {
        log::Level::Trace => Level::Trace,
        log::Level::Debug => Level::Debug,
        log::Level::Info => Level::Info,
        log::Level::Warn => Level::Warn,
        log::Level::Error => Level::Error,
    }
}

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

impl LogBridge {
    /// Bridge every record at or below `log::LevelFilter::Trace` to `handler`.
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            handler,
            max_level: log::LevelFilter::Trace,
        }
    }

    /// Cap the verbosity forwarded to the handler.
    pub fn with_max_level(mut self, max_level: log::LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    /// Install the bridge as the global `log` backend.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let metadata = RecordMetadata {
            pathname: record.file().unwrap_or_default().to_owned(),
            filename: record
                .file()
                .and_then(|path| Path::new(path).file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            module: record.module_path().unwrap_or_default().to_owned(),
            line: record.line().unwrap_or(0),
            ..RecordMetadata::default()
        };
        let logger = normalise_target(record.target());
        let converted = LogRecord::with_metadata(
            logger.as_ref(),
            map_level(record.level()),
            Value::from(record.args().to_string()),
            metadata,
        );
        self.handler.emit(&converted);
    }

    fn flush(&self) {}
}
