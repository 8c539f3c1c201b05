use crate::config::ClientConfig;
use crate::error::Error;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request};
use hyper::Body;

use std::collections::HashMap;

/// Per-request options accepted from callers. The set is deliberately closed:
/// extra headers and a body override are the only knobs a caller gets, so
/// anything else (timeouts, redirect policy, ...) simply cannot reach the
/// outgoing request. Client certificates are part of `ClientConfig`, since
/// TLS identity is fixed per connection pool rather than per request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RequestOptions {
    headers: HashMap<String, String>,
    body: Option<String>,
}

impl RequestOptions {
    pub fn new() -> RequestOptions {
        RequestOptions::default()
    }

    /// Adds a header to the request. Caller headers are merged into the
    /// defaults one key at a time, so adding `Authorization` leaves the
    /// default `Content-Type` in place, while adding `Content-Type` replaces
    /// only that one entry.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> RequestOptions {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request body, overriding any body passed positionally to
    /// `request`.
    pub fn body(mut self, body: impl Into<String>) -> RequestOptions {
        self.body = Some(body.into());
        self
    }
}

/// Builds the fully-qualified url for a request path: paths that already
/// start with `/api` go directly under the endpoint, everything else gets the
/// `/api/<version>` prefix first.
pub(crate) fn url_for_path(config: &ClientConfig, path: &str) -> String {
    if path.starts_with("/api") {
        format!("{}{}", config.api_server_endpoint, path)
    } else {
        format!(
            "{}/api/{}{}",
            config.api_server_endpoint, config.api_version, path
        )
    }
}

/// Assembles the outgoing request: resolves the url, merges default headers
/// with caller options, and attaches the effective body.
pub(crate) fn build_request(
    config: &ClientConfig,
    method: Method,
    path: &str,
    body: Option<String>,
    options: &RequestOptions,
) -> Result<Request<Body>, Error> {
    let uri = url_for_path(config, path);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::USER_AGENT, header_value(&config.user_agent)?);
    if let Some(auth) = config
        .credentials
        .as_ref()
        .and_then(|creds| creds.header_value())
    {
        headers.insert(header::AUTHORIZATION, header_value(auth)?);
    }

    for (name, value) in options.headers.iter() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Request(http::Error::from(e)))?;
        headers.insert(name, header_value(value)?);
    }

    let effective_body = options.body.as_ref().or_else(|| body.as_ref());
    let hyper_body = match effective_body {
        Some(contents) => Body::from(contents.clone()),
        None => Body::empty(),
    };

    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(existing) = builder.headers_mut() {
        *existing = headers;
    }
    builder.body(hyper_body).map_err(Error::Request)
}

fn header_value(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|e| Error::Request(http::Error::from(e)))
}
