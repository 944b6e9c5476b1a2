//! Transport-level request and response types.
//!
//! These are the test runner's framework-agnostic representation of an HTTP
//! exchange, as opposed to the host's native types. They are plain data:
//! the bridge owns all translation between the two shapes.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::uploads::FileField;

/// Generic HTTP request as produced by the test runner.
#[derive(Clone, Debug, Default)]
pub struct TransportRequest {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Absolute or origin-form URL.
    pub url: String,
    /// Header name/value pairs in order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Bytes,
    /// Nested uploaded-file payload keyed by form-field name.
    pub files: BTreeMap<String, FileField>,
}

impl TransportRequest {
    /// Construct a bodiless request for `method` and `url`.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Shorthand for a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Shorthand for a POST request with `body`.
    #[must_use]
    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let mut request = Self::new("POST", url);
        request.body = body.into();
        request
    }

    /// Append a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a file field.
    #[must_use]
    pub fn file(mut self, field_name: impl Into<String>, field: FileField) -> Self {
        self.files.insert(field_name.into(), field);
        self
    }
}

/// Generic HTTP response handed back to the test runner.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// Numeric status code.
    pub status: u16,
    /// Header name/value pairs in order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Response body decoded as UTF-8, lossily.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
