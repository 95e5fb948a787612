//! Body decoders.
//!
//! The body is decoded into the record before any field is read. Decoders
//! are selected by exact match on the `Content-Type` header; a request with
//! an unregistered content type is left undecoded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::BoxError;

/// Content type of the built-in JSON decoder.
pub const APPLICATION_JSON: &str = "application/json";

/// Error raised while decoding a request body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body exceeds the configured size limit.
    #[error("payload too large: max {limit} bytes, got {actual} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
        /// Body length in bytes.
        actual: usize,
    },

    /// The body is not valid JSON, or does not fit the record.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A record a decoder can write a decoded document into.
///
/// Implemented for every type that implements [`serde::Serialize`] and
/// [`serde::Deserialize`]. The document is merged into the record's current
/// value: keys the document carries overwrite, keys it leaves out keep what
/// the record already holds. Nested objects merge the same way; arrays and
/// scalars, `null` included, replace.
///
/// Fields marked `#[serde(skip)]` do not survive the round trip and are reset
/// to their default.
pub trait DecodeTarget {
    /// Merges `document` into the record.
    fn apply_document(&mut self, document: Value) -> Result<(), BoxError>;
}

impl<T: Serialize + DeserializeOwned> DecodeTarget for T {
    fn apply_document(&mut self, document: Value) -> Result<(), BoxError> {
        let mut current = serde_json::to_value(&*self).map_err(DecodeError::Json)?;
        merge(&mut current, document);
        *self = serde_json::from_value(current).map_err(DecodeError::Json)?;
        Ok(())
    }
}

/// Overlays `patch` onto `base`, object key by object key.
fn merge(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

/// Decodes a request body into a record.
///
/// # Example
///
/// ```rust
/// use reqpick::{BoxError, DecodeTarget, Decoder};
/// use bytes::Bytes;
/// use serde_json::{Map, Value};
///
/// /// Decodes `key: value` lines into a flat object.
/// struct LineDecoder(Bytes);
///
/// impl Decoder for LineDecoder {
///     fn decode(&mut self, target: &mut dyn DecodeTarget) -> Result<(), BoxError> {
///         let text = std::str::from_utf8(&self.0)?;
///         let object: Map<String, Value> = text
///             .lines()
///             .filter_map(|line| line.split_once(": "))
///             .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
///             .collect();
///         target.apply_document(Value::Object(object))
///     }
/// }
/// ```
pub trait Decoder {
    /// Decodes the body this decoder was created for into `target`.
    fn decode(&mut self, target: &mut dyn DecodeTarget) -> Result<(), BoxError>;
}

/// Creates a decoder for a request body.
pub type DecoderFactory = Arc<dyn Fn(Bytes) -> Box<dyn Decoder> + Send + Sync>;

/// Decodes a JSON body.
#[derive(Debug, Clone)]
pub struct JsonDecoder {
    body: Bytes,
}

impl JsonDecoder {
    /// Creates a decoder for `body`.
    #[must_use]
    pub fn new(body: Bytes) -> Self {
        Self { body }
    }

    /// Factory suitable for [`DecoderRegistry::register`].
    #[must_use]
    pub fn boxed(body: Bytes) -> Box<dyn Decoder> {
        Box::new(Self::new(body))
    }
}

impl Decoder for JsonDecoder {
    fn decode(&mut self, target: &mut dyn DecodeTarget) -> Result<(), BoxError> {
        let document: Value = serde_json::from_slice(&self.body).map_err(DecodeError::Json)?;
        target.apply_document(document)
    }
}

/// Decoder that leaves the record untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDecoder;

impl Decoder for NoopDecoder {
    fn decode(&mut self, _target: &mut dyn DecodeTarget) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Decoder factories keyed by content type.
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    factories: HashMap<String, DecoderFactory>,
}

impl DecoderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `content_type`, replacing any earlier one.
    pub fn register<F>(&mut self, content_type: impl Into<String>, factory: F)
    where
        F: Fn(Bytes) -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        self.factories.insert(content_type.into(), Arc::new(factory));
    }

    /// Returns true if a factory is registered for exactly `content_type`.
    #[must_use]
    pub fn contains(&self, content_type: &str) -> bool {
        self.factories.contains_key(content_type)
    }

    /// Returns the registered content types, sorted.
    #[must_use]
    pub fn content_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Creates a decoder for `body`.
    ///
    /// Falls back to [`NoopDecoder`] when no factory matches.
    #[must_use]
    pub fn resolve(&self, content_type: &str, body: Bytes) -> Box<dyn Decoder> {
        match self.factories.get(content_type) {
            Some(factory) => factory(body),
            None => Box::new(NoopDecoder),
        }
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("content_types", &self.content_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        age: u32,
    }

    fn json_registry() -> DecoderRegistry {
        let mut registry = DecoderRegistry::new();
        registry.register(APPLICATION_JSON, JsonDecoder::boxed);
        registry
    }

    #[test]
    fn test_json_decode() {
        let mut user = User::default();
        json_registry()
            .resolve(APPLICATION_JSON, Bytes::from_static(br#"{"name":"Alice","age":30}"#))
            .decode(&mut user)
            .unwrap();
        assert_eq!(
            user,
            User {
                name: "Alice".into(),
                age: 30
            }
        );
    }

    #[test]
    fn test_json_decode_keeps_missing_keys() {
        let mut user = User {
            name: "Bob".into(),
            age: 40,
        };
        JsonDecoder::new(Bytes::from_static(br#"{"age":41}"#))
            .decode(&mut user)
            .unwrap();
        assert_eq!(user.name, "Bob");
        assert_eq!(user.age, 41);
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Account {
        owner: User,
        tags: Vec<String>,
        nickname: Option<String>,
    }

    #[test]
    fn test_json_decode_merges_nested() {
        let mut account = Account {
            owner: User {
                name: "Bob".into(),
                age: 40,
            },
            tags: vec!["a".into(), "b".into()],
            nickname: Some("bobby".into()),
        };
        JsonDecoder::new(Bytes::from_static(
            br#"{"owner":{"age":41},"tags":["c"],"nickname":null}"#,
        ))
        .decode(&mut account)
        .unwrap();

        assert_eq!(account.owner.name, "Bob");
        assert_eq!(account.owner.age, 41);
        assert_eq!(account.tags, ["c"]);
        assert_eq!(account.nickname, None);
    }

    #[test]
    fn test_json_decode_non_object_document() {
        let mut user = User::default();
        let err = JsonDecoder::new(Bytes::from_static(b"[1,2]"))
            .decode(&mut user)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<DecodeError>(), Some(DecodeError::Json(_))));
    }

    #[test]
    fn test_json_decode_errors() {
        let mut user = User::default();
        assert!(JsonDecoder::new(Bytes::from_static(b"{broken"))
            .decode(&mut user)
            .is_err());
        assert!(JsonDecoder::new(Bytes::from_static(br#"{"age":"old"}"#))
            .decode(&mut user)
            .is_err());
        assert!(JsonDecoder::new(Bytes::new()).decode(&mut user).is_err());
    }

    #[test]
    fn test_json_error_is_decode_error() {
        let mut user = User::default();
        let err = JsonDecoder::new(Bytes::from_static(b"{broken"))
            .decode(&mut user)
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<DecodeError>(), Some(DecodeError::Json(_))));
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = DecodeError::PayloadTooLarge {
            limit: 1024,
            actual: 2048,
        };
        assert_eq!(err.to_string(), "payload too large: max 1024 bytes, got 2048 bytes");
    }

    #[test]
    fn test_unregistered_content_type_is_noop() {
        let mut user = User {
            name: "kept".into(),
            age: 1,
        };
        json_registry()
            .resolve("text/plain", Bytes::from_static(b"{broken"))
            .decode(&mut user)
            .unwrap();
        assert_eq!(user.name, "kept");
    }

    #[test]
    fn test_match_is_exact() {
        let registry = json_registry();
        assert!(registry.contains("application/json"));
        assert!(!registry.contains("application/json; charset=utf-8"));
        assert!(!registry.contains("Application/JSON"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = json_registry();
        registry.register(APPLICATION_JSON, |_| Box::new(NoopDecoder));
        let mut user = User::default();
        registry
            .resolve(APPLICATION_JSON, Bytes::from_static(b"{broken"))
            .decode(&mut user)
            .unwrap();
        assert_eq!(registry.content_types(), vec![APPLICATION_JSON]);
    }
}
