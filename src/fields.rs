//! Well-known log record field names.
//!
//! Origin-field lists and routing-key defaults reference record fields by
//! name. The set of names a record can carry natively is closed, so
//! configuration is validated against this enum instead of a loose string
//! list; unknown names fail handler construction rather than silently
//! producing empty payload columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// A field name recognised in normalized log records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordField {
    Name,
    LevelNo,
    LevelName,
    PathName,
    FileName,
    Module,
    LineNo,
    FuncName,
    Created,
    AscTime,
    Msecs,
    RelativeCreated,
    Thread,
    ThreadName,
    Process,
    ProcessName,
    Message,
}

/// Raised when a configured field name is not part of the closed field set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised log record field {0:?}")]
pub struct UnknownFieldError(pub String);

impl RecordField {
    /// The field's key in normalized records and wire payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordField::Name => "name",
            RecordField::LevelNo => "levelno",
            RecordField::LevelName => "levelname",
            RecordField::PathName => "pathname",
            RecordField::FileName => "filename",
            RecordField::Module => "module",
            RecordField::LineNo => "lineno",
            RecordField::FuncName => "funcName",
            RecordField::Created => "created",
            RecordField::AscTime => "asctime",
            RecordField::Msecs => "msecs",
            RecordField::RelativeCreated => "relativeCreated",
            RecordField::Thread => "thread",
            RecordField::ThreadName => "threadName",
            RecordField::Process => "process",
            RecordField::ProcessName => "processName",
            RecordField::Message => "message",
        }
    }
}

/// Origin fields included in the wire payload when none are configured.
pub fn default_origin_fields() -> Vec<RecordField> {
    vec![
        RecordField::Name,
        RecordField::AscTime,
        RecordField::Process,
        RecordField::Message,
    ]
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "levelno" => Ok(Self::LevelNo),
            "levelname" => Ok(Self::LevelName),
            "pathname" => Ok(Self::PathName),
            "filename" => Ok(Self::FileName),
            "module" => Ok(Self::Module),
            "lineno" => Ok(Self::LineNo),
            "funcName" => Ok(Self::FuncName),
            "created" => Ok(Self::Created),
            "asctime" => Ok(Self::AscTime),
            "msecs" => Ok(Self::Msecs),
            "relativeCreated" => Ok(Self::RelativeCreated),
            "thread" => Ok(Self::Thread),
            "threadName" => Ok(Self::ThreadName),
            "process" => Ok(Self::Process),
            "processName" => Ok(Self::ProcessName),
            // `msg` is a historical spelling of the raw message field.
            "message" | "msg" => Ok(Self::Message),
            other => Err(UnknownFieldError(other.to_owned())),
        }
    }
}

impl Serialize for RecordField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecordField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("name", RecordField::Name)]
    #[case("funcName", RecordField::FuncName)]
    #[case("relativeCreated", RecordField::RelativeCreated)]
    #[case("message", RecordField::Message)]
    #[case("msg", RecordField::Message)]
    fn parses_known_names(#[case] input: &str, #[case] expected: RecordField) {
        assert_eq!(input.parse::<RecordField>(), Ok(expected));
    }

    #[rstest]
    #[case("funcname")]
    #[case("severity")]
    #[case("")]
    fn rejects_unknown_names(#[case] input: &str) {
        let err = input.parse::<RecordField>().expect_err("name must be rejected");
        assert_eq!(err, UnknownFieldError(input.to_owned()));
    }

    #[rstest]
    fn default_fields_cover_payload_essentials() {
        let fields = default_origin_fields();
        assert_eq!(
            fields,
            vec![
                RecordField::Name,
                RecordField::AscTime,
                RecordField::Process,
                RecordField::Message,
            ]
        );
    }
}
