//! Request context providing access to request data.
//!
//! The [`RequestContext`] is the buffered view of an HTTP request the
//! [`Picker`](crate::Picker) binds from. It is produced by the server or
//! router in front of the handler; the picker only reads from it.

use std::borrow::Cow;
use std::sync::OnceLock;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Uri};
use tracing::debug;

use crate::Params;

/// Context providing access to all parts of an HTTP request.
///
/// The body is fully buffered, so decoding it and reading form fields from
/// it can both happen during the same bind without consuming anything twice.
/// Query and form pairs are parsed lazily, at most once per context.
///
/// # Example
///
/// ```rust
/// use reqpick::{Params, RequestContext};
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
///
/// let mut params = Params::new();
/// params.push("id", "123");
///
/// let ctx = RequestContext::new(
///     Method::GET,
///     Uri::from_static("/users/123?expand=true"),
///     HeaderMap::new(),
///     Bytes::new(),
///     params,
/// );
///
/// assert_eq!(ctx.path_param("id"), Some("123"));
/// assert_eq!(ctx.query("expand"), Some("true"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
    query_pairs: OnceLock<Vec<(String, String)>>,
    form_pairs: OnceLock<Vec<(String, String)>>,
}

impl RequestContext {
    /// Creates a new request context.
    #[must_use]
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        path_params: Params,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            path_params,
            query_pairs: OnceLock::new(),
            form_pairs: OnceLock::new(),
        }
    }

    /// Creates a context from the parts of an [`http::Request`] and its
    /// buffered body.
    #[must_use]
    pub fn from_parts(parts: http::request::Parts, body: Bytes, path_params: Params) -> Self {
        Self::new(parts.method, parts.uri, parts.headers, body, path_params)
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the query string if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body as bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the path parameters.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Returns a path parameter by name.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    /// Returns the first value of a header as a string.
    ///
    /// Header names are matched case-insensitively. Bytes that are not valid
    /// UTF-8 are replaced with U+FFFD.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Returns the first value of a query parameter, percent-decoded.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        first(self.query_pairs(), name)
    }

    /// Returns the first value of a form field.
    ///
    /// Fields of a URL-encoded body are consulted first, then the query
    /// string. The body is only parsed as a form for POST, PUT and PATCH
    /// requests with an `application/x-www-form-urlencoded` content type.
    #[must_use]
    pub fn form(&self, name: &str) -> Option<&str> {
        first(self.form_pairs(), name).or_else(|| self.query(name))
    }

    fn query_pairs(&self) -> &[(String, String)] {
        self.query_pairs
            .get_or_init(|| parse_pairs(self.query_string().unwrap_or("").as_bytes()))
    }

    fn form_pairs(&self) -> &[(String, String)] {
        self.form_pairs.get_or_init(|| {
            if self.has_form_body() {
                parse_pairs(&self.body)
            } else {
                Vec::new()
            }
        })
    }

    fn has_form_body(&self) -> bool {
        if ![Method::POST, Method::PUT, Method::PATCH].contains(&self.method) {
            return false;
        }
        self.content_type()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .is_some_and(|m| m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.as_ref())
    }
}

fn first<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    serde_urlencoded::from_bytes(input).unwrap_or_else(|err| {
        debug!(error = %err, "ignoring malformed url-encoded pairs");
        Vec::new()
    })
}

/// Builder for constructing a [`RequestContext`].
///
/// Method and URI default to `GET /`.
#[derive(Debug, Default)]
pub struct RequestContextBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
}

impl RequestContextBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Appends a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a single path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push(name, value);
        self
    }

    /// Builds the request context.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext::new(
            self.method.unwrap_or(Method::GET),
            self.uri.unwrap_or_else(|| Uri::from_static("/")),
            self.headers,
            self.body,
            self.path_params,
        )
    }
}
