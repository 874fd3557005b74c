//! Log record representation and normalization.
//!
//! `LogRecord` captures a log event together with contextual metadata such
//! as source location, creation time, and thread/process identity.
//! [`LogRecord::normalize`] flattens the record into the uniform field
//! mapping consumed by the routing-key compiler and the payload serializer.

use std::env;
use std::thread::{self, ThreadId};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::fields::RecordField;
use crate::level::Level;

/// Reference point for the `relativeCreated` field.
static PROCESS_START: Lazy<SystemTime> = Lazy::new(SystemTime::now);

/// Executable stem reported as `processName`, resolved once.
static PROCESS_NAME: Lazy<Option<String>> = Lazy::new(|| {
    env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
});

/// Additional context associated with a log record.
#[derive(Clone, Debug)]
pub struct RecordMetadata {
    /// Full path of the source file that produced the record.
    pub pathname: String,
    /// File-name component of `pathname`.
    pub filename: String,
    /// Module path where the log call originated.
    pub module: String,
    /// Line number in the source file.
    pub line: u32,
    /// Function that produced the record.
    pub func_name: String,
    /// Time the record was created.
    pub created: SystemTime,
    /// ID of the thread that created the record.
    pub thread_id: ThreadId,
    /// Name of the thread that created the record (if any).
    pub thread_name: Option<String>,
    /// Process ID.
    pub process: u32,
    /// Custom attributes copied verbatim into the normalized record.
    ///
    /// Well-known field names take precedence over entries placed here.
    pub extra: Map<String, Value>,
}

impl RecordMetadata {
    fn capture_runtime() -> (SystemTime, ThreadId, Option<String>) {
        let current = thread::current();
        (
            SystemTime::now(),
            current.id(),
            current.name().map(ToString::to_string),
        )
    }
}

impl Default for RecordMetadata {
    fn default() -> Self {
        let (created, thread_id, thread_name) = Self::capture_runtime();
        Self {
            pathname: String::new(),
            filename: String::new(),
            module: String::new(),
            line: 0,
            func_name: String::new(),
            created,
            thread_id,
            thread_name,
            process: std::process::id(),
            extra: Map::new(),
        }
    }
}

/// A single log event, immutable for the duration of one emit.
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// Name of the logger that created this record.
    pub logger: String,
    /// Record severity.
    pub level: Level,
    /// The raw message value: a template string or a structured mapping,
    /// stored before any formatting is applied.
    pub message: Value,
    /// Contextual metadata for the record.
    pub metadata: RecordMetadata,
}

impl LogRecord {
    /// Construct a record from logger `name`, `level`, and raw `message`.
    pub fn new(logger: &str, level: Level, message: impl Into<Value>) -> Self {
        Self {
            logger: logger.to_owned(),
            level,
            message: message.into(),
            metadata: RecordMetadata::default(),
        }
    }

    /// Construct a record with explicit source location and custom attributes.
    ///
    /// Creation time and thread identity are captured from the calling
    /// context, overriding whatever the supplied metadata carried.
    pub fn with_metadata(
        logger: &str,
        level: Level,
        message: impl Into<Value>,
        mut metadata: RecordMetadata,
    ) -> Self {
        let (created, thread_id, thread_name) = RecordMetadata::capture_runtime();
        metadata.created = created;
        metadata.thread_id = thread_id;
        metadata.thread_name = thread_name;
        Self {
            logger: logger.to_owned(),
            level,
            message: message.into(),
            metadata,
        }
    }

    /// Flatten the record into a uniform field-to-value mapping.
    ///
    /// Custom attributes come first; well-known fields override clashes.
    /// The derived `asctime` (local wall-clock form of `created`) and
    /// `message` (raw message value) fields are always present.
    pub fn normalize(&self) -> Map<String, Value> {
        let meta = &self.metadata;
        let since_epoch = meta.created.duration_since(UNIX_EPOCH).unwrap_or_default();
        let relative = meta
            .created
            .duration_since(*PROCESS_START)
            .unwrap_or_default();

        let mut out = meta.extra.clone();
        let mut put = |field: RecordField, value: Value| {
            out.insert(field.as_str().to_owned(), value);
        };
        put(RecordField::Name, Value::from(self.logger.as_str()));
        put(RecordField::LevelNo, Value::from(self.level.code()));
        put(RecordField::LevelName, Value::from(self.level.name()));
        put(RecordField::PathName, Value::from(meta.pathname.as_str()));
        put(RecordField::FileName, Value::from(meta.filename.as_str()));
        put(RecordField::Module, Value::from(meta.module.as_str()));
        put(RecordField::LineNo, Value::from(meta.line));
        put(RecordField::FuncName, Value::from(meta.func_name.as_str()));
        put(RecordField::Created, Value::from(since_epoch.as_secs_f64()));
        put(
            RecordField::Msecs,
            Value::from(f64::from(since_epoch.subsec_nanos()) / 1_000_000.0),
        );
        put(
            RecordField::RelativeCreated,
            Value::from(relative.as_secs_f64() * 1_000.0),
        );
        put(
            RecordField::Thread,
            Value::from(format!("{:?}", meta.thread_id)),
        );
        put(
            RecordField::ThreadName,
            meta.thread_name.as_deref().map_or(Value::Null, Value::from),
        );
        put(RecordField::Process, Value::from(meta.process));
        put(
            RecordField::ProcessName,
            PROCESS_NAME.as_deref().map_or(Value::Null, Value::from),
        );
        put(RecordField::AscTime, Value::from(format_asctime(meta.created)));
        put(RecordField::Message, self.message.clone());
        out
    }
}

/// Format a creation time as `YYYY-MM-DD HH:MM:SS` in local time.
pub(crate) fn format_asctime(created: SystemTime) -> String {
    DateTime::<Local>::from(created)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
