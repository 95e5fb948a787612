//! # reqpick
//!
//! Binds values from an HTTP request into typed structs.
//!
//! Each field of a record names where its value comes from: a path
//! parameter, the query string, a header or a form field. The request body
//! is decoded into the record first, by a decoder chosen from the exact
//! `Content-Type` header. Raw values are converted according to the field's
//! declared type and then checked against the field's validation rules.
//!
//! ## Sources
//!
//! | Tag | Source | Description |
//! |-----|--------|-------------|
//! | `path` | URL path | A path parameter resolved by the router |
//! | `query` | Query string | First value of a query parameter |
//! | `header` | Headers | First value of a header, case-insensitive |
//! | `form` | Body, then query | First value of a URL-encoded form field |
//!
//! ## Example
//!
//! ```rust
//! use reqpick::{Pick, Picker, RequestContextBuilder};
//! use http::{Method, Uri};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Pick)]
//! struct UpdateUser {
//!     #[pick(path = "id")]
//!     pub id: u64,
//!     #[pick(query = "notify")]
//!     pub notify: bool,
//!     #[pick(header = "x-request-id", min_length = 8)]
//!     pub request_id: String,
//!     pub email: String,
//! }
//!
//! let req = RequestContextBuilder::new()
//!     .method(Method::PUT)
//!     .uri(Uri::from_static("/users/42?notify=true"))
//!     .header("content-type", "application/json")
//!     .header("x-request-id", "req-00042")
//!     .body(r#"{"email":"ada@example.com"}"#)
//!     .path_param("id", "42")
//!     .build();
//!
//! let mut update = UpdateUser::default();
//! Picker::new().pick(&mut update, &req).unwrap();
//!
//! assert_eq!(update.id, 42);
//! assert!(update.notify);
//! assert_eq!(update.request_id, "req-00042");
//! assert_eq!(update.email, "ada@example.com");
//! ```
//!
//! ## Assignment
//!
//! A field is assigned by the first of:
//!
//! 1. its companion setter, declared with `#[pick(setter = "set_x")]`;
//! 2. a setter registered on the [`Picker`] for the field's type;
//! 3. the built-in conversion for `bool`, integers, floats, complex
//!    numbers and `String`.
//!
//! Fields that are not `pub` cannot be assigned directly and need a
//! companion setter when they carry a source tag.
//!
//! ## Error Handling
//!
//! Binding stops at the first failure and returns a [`PickError`], which
//! renders as `pick <Record>.<field> from <source>[<key>]: <cause>` and maps
//! to an HTTP status code with [`PickError::status_code`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

extern crate self as reqpick;

mod coerce;
mod config;
mod context;
mod decode;
mod descriptor;
mod error;
mod params;
mod picker;
mod setter;
mod source;
mod validate;

pub use coerce::{lookup as coercion_for, CoerceError, Coercion, Kind};
pub use config::{ConfigError, PickerConfig, DEFAULT_MAX_BODY_SIZE};
pub use context::{RequestContext, RequestContextBuilder};
pub use decode::{
    DecodeError, DecodeTarget, Decoder, DecoderFactory, DecoderRegistry, JsonDecoder,
    NoopDecoder, APPLICATION_JSON,
};
pub use descriptor::{Descriptor, DescriptorBuilder, Field, FieldDescriptor, Pick};
pub use error::{BoxError, DescriptorError, PickError, PickErrorKind};
pub use params::Params;
pub use picker::Picker;
pub use setter::{SetterFn, SetterOutput};
pub use source::{Locator, Source};
pub use validate::{Rule, RuleKind, ValidationError};

/// Derives [`Pick`] from `#[pick(...)]` field attributes.
///
/// ```rust
/// use reqpick::{BoxError, Pick};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize, Pick)]
/// #[pick(name = "Login")]
/// struct LoginForm {
///     #[pick(form = "user", min_length = 1, max_length = 64)]
///     pub user: String,
///     #[pick(header = "x-otp", setter = "set_otp")]
///     otp: String,
/// }
///
/// impl LoginForm {
///     fn set_otp(&mut self, raw: &str) -> Result<(), BoxError> {
///         if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
///             return Err("expected six digits".into());
///         }
///         self.otp = raw.to_owned();
///         Ok(())
///     }
/// }
///
/// assert_eq!(LoginForm::descriptor().name(), "Login");
/// ```
///
/// Field keys: one of `path`, `query`, `header`, `form`; optionally
/// `min_length`, `max_length`, `minimum`, `maximum` and `setter`.
pub use reqpick_macros::Pick;
