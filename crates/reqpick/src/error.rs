//! Error types.
//!
//! [`PickError`] is returned by [`Picker::pick`](crate::Picker::pick) and
//! names the destination field, the request location and the cause.
//! [`DescriptorError`] is raised when a record descriptor is inconsistent.

use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::coerce::{CoerceError, Kind};
use crate::validate::{RuleKind, ValidationError};
use crate::Locator;

/// Boxed error returned by decoders and setters.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Category of a [`PickError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickErrorKind {
    /// The body decoder rejected the request body.
    Body,
    /// The body exceeds the configured size limit.
    PayloadTooLarge,
    /// A raw value did not parse as the field's type.
    Syntax,
    /// An assigned value violated a validation rule.
    Validation,
    /// A companion setter or registered override returned an error.
    Setter,
    /// The field's type cannot be assigned from text.
    Unsupported,
}

impl fmt::Display for PickErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Body => "body",
            Self::PayloadTooLarge => "payload too large",
            Self::Syntax => "syntax",
            Self::Validation => "validation",
            Self::Setter => "setter",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Error that occurs while binding a request into a record.
///
/// Renders as `pick <Dest> from <locator>: <cause>`, where `Dest` is the
/// record name (or `Record.field` for a field failure) and the locator is
/// `body` or `<source>[<key>]`.
///
/// # Example
///
/// ```rust
/// use reqpick::{Locator, PickError, PickErrorKind, Source, ValidationError};
/// use http::StatusCode;
///
/// let err = PickError::new(
///     "Person.age",
///     Locator::field(Source::Header, "age"),
///     PickErrorKind::Validation,
///     ValidationError::Minimum { bound: 0.0, actual: -1.0 },
/// );
/// assert_eq!(err.to_string(), "pick Person.age from header[age]: minimum exceeded");
/// assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
/// ```
#[derive(Debug, Error)]
#[error("pick {dest} from {locator}: {cause}")]
pub struct PickError {
    dest: String,
    locator: Locator,
    kind: PickErrorKind,
    #[source]
    cause: BoxError,
}

impl PickError {
    /// Creates a new error.
    pub fn new(
        dest: impl Into<String>,
        locator: Locator,
        kind: PickErrorKind,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self {
            dest: dest.into(),
            locator,
            kind,
            cause: cause.into(),
        }
    }

    pub(crate) fn coerce(dest: String, locator: Locator, err: CoerceError) -> Self {
        let kind = match err {
            CoerceError::Unsupported { .. } | CoerceError::SlotMismatch { .. } => {
                PickErrorKind::Unsupported
            }
            CoerceError::InvalidSyntax { .. } | CoerceError::OutOfRange { .. } => {
                PickErrorKind::Syntax
            }
        };
        Self::new(dest, locator, kind, err)
    }

    pub(crate) fn validation(dest: String, locator: Locator, err: ValidationError) -> Self {
        Self::new(dest, locator, PickErrorKind::Validation, err)
    }

    /// Returns the destination: the record name, or `Record.field`.
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Returns where in the request the failing value came from.
    #[must_use]
    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> PickErrorKind {
        self.kind
    }

    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.cause.as_ref()
    }

    /// Returns true when a validation rule was violated.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.kind == PickErrorKind::Validation
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            PickErrorKind::Body | PickErrorKind::Syntax | PickErrorKind::Setter => {
                StatusCode::BAD_REQUEST
            }
            PickErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            PickErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            PickErrorKind::Unsupported => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            PickErrorKind::Body => "MALFORMED_BODY",
            PickErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            PickErrorKind::Syntax => "INVALID_PARAMETER",
            PickErrorKind::Validation => "VALIDATION_FAILED",
            PickErrorKind::Setter => "SETTER_FAILED",
            PickErrorKind::Unsupported => "UNSUPPORTED_FIELD",
        }
    }
}

/// Error raised when a record descriptor is inconsistent.
///
/// Descriptors generated by `#[derive(Pick)]` are built on first use and
/// panic with this error's message; most variants are rejected at compile
/// time by the derive already.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// A field declares more than one source.
    #[error("field {dest}: multiple source tags ({sources}), declare exactly one")]
    MultipleSources {
        /// `Record.field`
        dest: String,
        /// The declared sources, comma separated.
        sources: String,
    },

    /// A restricted field has a source but no companion setter.
    #[error("restricted field {dest}, missing {setter}")]
    MissingSetter {
        /// `Record.field`
        dest: String,
        /// Name of the expected companion setter.
        setter: String,
    },

    /// A validation bound does not parse.
    #[error("field {dest}: malformed {rule} bound {literal:?}")]
    MalformedBound {
        /// `Record.field`
        dest: String,
        /// Rule the bound belongs to.
        rule: RuleKind,
        /// The literal as declared.
        literal: String,
    },

    /// A validation rule does not apply to the field's type.
    #[error("field {dest}: {rule} does not apply to {type_name} ({kind})")]
    RuleNotApplicable {
        /// `Record.field`
        dest: String,
        /// The offending rule.
        rule: RuleKind,
        /// Declared type of the field.
        type_name: &'static str,
        /// Kind of the declared type.
        kind: Kind,
    },

    /// The same rule is declared twice on one field.
    #[error("field {dest}: duplicate {rule} rule")]
    DuplicateRule {
        /// `Record.field`
        dest: String,
        /// The repeated rule.
        rule: RuleKind,
    },

    /// Validation rules on a field that is never assigned.
    #[error("field {dest}: validation rules declared without a source tag")]
    RulesWithoutSource {
        /// `Record.field`
        dest: String,
    },

    /// Two fields share a name.
    #[error("field {dest}: declared twice")]
    DuplicateField {
        /// `Record.field`
        dest: String,
    },

    /// A tagged field's type can never be assigned from text.
    #[error("field {dest}: set {type_name}: unsupported")]
    Unsupported {
        /// `Record.field`
        dest: String,
        /// Declared type of the field.
        type_name: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    #[test]
    fn test_field_error_display() {
        let err = PickError::new(
            "Person.age",
            Locator::field(Source::Header, "age"),
            PickErrorKind::Syntax,
            "bad",
        );
        assert_eq!(err.to_string(), "pick Person.age from header[age]: bad");
        assert_eq!(err.dest(), "Person.age");
        assert_eq!(err.locator(), &Locator::field(Source::Header, "age"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_body_error_display() {
        let err = PickError::new("Person", Locator::Body, PickErrorKind::Body, "eof");
        assert_eq!(err.to_string(), "pick Person from body: eof");
        assert_eq!(err.error_code(), "MALFORMED_BODY");
    }

    #[test]
    fn test_source_chain() {
        let err = PickError::validation(
            "Person.name".into(),
            Locator::field(Source::Query, "name"),
            ValidationError::MaxLength { max: 3, actual: 4 },
        );
        let source = err.source().expect("cause is the error source");
        assert_eq!(source.to_string(), "maxLength exceeded");
        assert!(err.is_validation());
        assert!(err.cause().downcast_ref::<ValidationError>().is_some());
    }

    #[test]
    fn test_coerce_error_kinds() {
        let locator = Locator::field(Source::Path, "id");
        let syntax = PickError::coerce(
            "R.id".into(),
            locator.clone(),
            CoerceError::InvalidSyntax {
                kind: Kind::I64,
                value: "hi".into(),
            },
        );
        assert_eq!(syntax.kind(), PickErrorKind::Syntax);
        assert_eq!(
            syntax.to_string(),
            r#"pick R.id from path[id]: parse i64: parsing "hi": invalid syntax"#
        );

        let unsupported = PickError::coerce(
            "R.id".into(),
            locator,
            CoerceError::Unsupported {
                type_name: "Vec<u8>",
            },
        );
        assert_eq!(unsupported.kind(), PickErrorKind::Unsupported);
        assert_eq!(unsupported.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_codes() {
        let status = |kind| PickError::new("R", Locator::Body, kind, "x").status_code();
        assert_eq!(status(PickErrorKind::Body), StatusCode::BAD_REQUEST);
        assert_eq!(status(PickErrorKind::PayloadTooLarge), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(status(PickErrorKind::Validation), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(PickErrorKind::Setter), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_setter_message() {
        let err = DescriptorError::MissingSetter {
            dest: "Person.token".into(),
            setter: "set_token".into(),
        };
        assert_eq!(err.to_string(), "restricted field Person.token, missing set_token");
    }
}
