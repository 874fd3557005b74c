//! Topic routing key derivation.
//!
//! A routing key is built from the application name plus one token per
//! configured field path, looked up in the normalized record. Resolution
//! never fails: a path that cannot be resolved to a routable value
//! contributes the `*` wildcard so the record stays deliverable, and the
//! finished key is kept within the broker's 255-character limit.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::fields::RecordField;

/// Longest routing key the broker accepts.
pub const MAX_ROUTING_KEY_LEN: usize = 255;

const WILDCARD: char = '*';

/// Raised when a routing-key field-path list is structurally invalid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingKeyError {
    #[error("routing key must list at least one field path")]
    Empty,
    #[error("the whole message field cannot be used as a routing key path")]
    MessageAsPath,
}

/// Ordered list of field paths a handler routes on.
///
/// Paths are dot-separated for nested lookup into mapping-valued fields,
/// e.g. `message.kind`. The list is fixed for the handler's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingKeySpec {
    paths: Vec<String>,
}

impl RoutingKeySpec {
    /// Validate and build a spec from field paths.
    ///
    /// The list must be non-empty, and the literal `message` path is
    /// rejected: routing on the full message body is disallowed, only its
    /// sub-fields may be referenced.
    pub fn new<I, S>(paths: I) -> Result<Self, RoutingKeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(RoutingKeyError::Empty);
        }
        if paths.iter().any(|path| path == RecordField::Message.as_str()) {
            return Err(RoutingKeyError::MessageAsPath);
        }
        Ok(Self { paths })
    }

    /// Paths routed on when none are configured.
    pub fn default_spec() -> Self {
        Self {
            paths: vec![
                RecordField::Name.as_str().to_owned(),
                RecordField::LevelName.as_str().to_owned(),
            ],
        }
    }

    /// The configured field paths.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Compile the routing key for one normalized record. Total: resolution
    /// gaps degrade to wildcards and the result never exceeds
    /// [`MAX_ROUTING_KEY_LEN`] characters.
    pub fn compile(&self, app_name: &str, normalized: &Map<String, Value>) -> String {
        let mut key = String::from(app_name);
        for path in &self.paths {
            key.push('.');
            match path_token(path, normalized) {
                Some(token) => key.push_str(&token),
                None => key.push(WILDCARD),
            }
        }
        self.govern_length(app_name, key)
    }

    /// Length governance: an over-long key collapses to all-wildcard
    /// segments when the application name itself is short, and is
    /// hard-truncated afterwards if still over the limit.
    fn govern_length(&self, app_name: &str, mut key: String) -> String {
        if app_name.chars().count() < MAX_ROUTING_KEY_LEN
            && key.chars().count() > MAX_ROUTING_KEY_LEN
        {
            key = format!("{app_name}{}", ".*".repeat(self.paths.len()));
        }
        if key.chars().count() > MAX_ROUTING_KEY_LEN {
            key = key.chars().take(MAX_ROUTING_KEY_LEN).collect();
        }
        key
    }
}

/// Resolve one field path against the normalized record.
///
/// The walk descends through mapping values segment by segment and stops at
/// the first non-mapping. A value landed on exactly at the last segment is
/// stringified if scalar; a string reached mid-walk still routes as-is.
/// `None` means the path contributes the wildcard.
fn path_token(path: &str, root: &Map<String, Value>) -> Option<String> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = root;
    for (index, segment) in segments.iter().enumerate() {
        let value = current.get(*segment);
        match value {
            Some(Value::Object(map)) => current = map,
            _ => {
                if index == segments.len() - 1 {
                    if let Some(token) = value.and_then(stringify_scalar) {
                        return Some(token);
                    }
                }
                return match value {
                    Some(Value::String(text)) => Some(text.clone()),
                    _ => None,
                };
            }
        }
    }
    // Walk exhausted on a mapping; mappings are not routable.
    None
}

fn stringify_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
