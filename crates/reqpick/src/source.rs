//! Value readers.
//!
//! A [`Source`] names the part of the request a field is read from; reading
//! never fails and yields an empty string when the value is absent.

use std::borrow::Cow;
use std::fmt;

use crate::RequestContext;

/// Where a field value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Path parameters resolved by the router (e.g., `/users/{id}`)
    Path,
    /// Query string parameters
    Query,
    /// HTTP headers
    Header,
    /// URL-encoded form fields, falling back to the query string
    Form,
}

impl Source {
    /// All sources, in the order tags are documented.
    pub const ALL: [Source; 4] = [Source::Path, Source::Query, Source::Header, Source::Form];

    /// Returns the tag name of this source.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Form => "form",
        }
    }

    /// Reads the value for `key` from the request.
    ///
    /// Absent values read as the empty string. Header values that are not
    /// valid UTF-8 are decoded lossily.
    #[must_use]
    pub fn read(self, ctx: &RequestContext, key: &str) -> String {
        let value = match self {
            Self::Path => ctx.path_param(key).map(str::to_owned),
            Self::Query => ctx.query(key).map(str::to_owned),
            Self::Header => ctx.header(key).map(Cow::into_owned),
            Self::Form => ctx.form(key).map(str::to_owned),
        };
        value.unwrap_or_default()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved origin of a bound value, used in error messages.
///
/// Renders as `<source>[<key>]`, e.g. `header[color]`, or `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// The request body, decoded as a whole.
    Body,
    /// A single keyed value.
    Field {
        /// Part of the request the value came from.
        kind: Source,
        /// Lookup key within that part.
        key: String,
    },
}

impl Locator {
    /// Creates a locator for a keyed value.
    pub fn field(kind: Source, key: impl Into<String>) -> Self {
        Self::Field {
            kind,
            key: key.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Body => f.write_str("body"),
            Self::Field { kind, key } => write!(f, "{kind}[{key}]"),
        }
    }
}
