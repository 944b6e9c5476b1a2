//! Translation between transport-level and host-native HTTP messages.
//!
//! The native types are the `http` crate's `Request`/`Response` with `Bytes`
//! bodies. Uploaded files are normalized into an [`UploadBag`] and carried
//! in the native request's extensions, which is where the host's kernel and
//! extractors expect to find them.

use bytes::Bytes;
use http::{
    HeaderMap, Method, Request, Response, Uri,
    header::{HeaderName, HeaderValue},
};

use crate::{
    error::DispatchError,
    transport::{TransportRequest, TransportResponse},
    uploads::{UploadBag, normalize_files},
};

/// Convert a transport request into the host-native representation.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidRequest`] when the method, URL, or a
/// header fails to parse as HTTP.
pub fn to_native(request: TransportRequest) -> Result<Request<Bytes>, DispatchError> {
    let method = request
        .method
        .parse::<Method>()
        .map_err(|err| DispatchError::InvalidRequest(format!("method {:?}: {err}", request.method)))?;
    let uri = request
        .url
        .parse::<Uri>()
        .map_err(|err| DispatchError::InvalidRequest(format!("url {:?}: {err}", request.url)))?;

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in &request.headers {
        let name = name
            .parse::<HeaderName>()
            .map_err(|err| DispatchError::InvalidRequest(format!("header name {name:?}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| DispatchError::InvalidRequest(format!("header value for {name}: {err}")))?;
        builder = builder.header(name, value);
    }

    let mut native = builder
        .body(request.body)
        .map_err(|err| DispatchError::InvalidRequest(err.to_string()))?;
    let bag = normalize_files(request.files);
    if !bag.is_empty() {
        native.extensions_mut().insert(bag);
    }
    Ok(native)
}

/// Seed request used for a boot with no inbound request yet: a GET against
/// the configured base URL.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidRequest`] when `base_url` is not a valid
/// URI.
pub fn placeholder_request(base_url: &str) -> Result<Request<Bytes>, DispatchError> {
    to_native(TransportRequest::get(base_url))
}

/// Clone a native request.
///
/// `http::Request` is not `Clone` because extensions may not be; the bridge
/// copies the parts it populates, including the [`UploadBag`] extension.
#[must_use]
pub fn duplicate_native(request: &Request<Bytes>) -> Request<Bytes> {
    let mut duplicate = Request::new(request.body().clone());
    *duplicate.method_mut() = request.method().clone();
    *duplicate.uri_mut() = request.uri().clone();
    *duplicate.version_mut() = request.version();
    *duplicate.headers_mut() = request.headers().clone();
    if let Some(bag) = request.extensions().get::<UploadBag>() {
        duplicate.extensions_mut().insert(bag.clone());
    }
    duplicate
}

/// Flatten a native response back into the transport representation.
#[must_use]
pub fn to_transport(response: Response<Bytes>) -> TransportResponse {
    let (parts, body) = response.into_parts();
    TransportResponse {
        status: parts.status.as_u16(),
        headers: flatten_headers(&parts.headers),
        body,
    }
}

fn flatten_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
