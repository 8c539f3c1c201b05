//! Crate-wide error type. Transport failures surface here unmodified; the
//! client performs no retries and no classification of transient vs.
//! permanent failures, so callers that need a policy build it on top.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// An io-level failure from the underlying hyper transport
    Io(hyper::Error),
    /// Failed to serialize a request body or deserialize a response body
    Serde(serde_json::Error),
    /// An outgoing request could not be assembled, e.g. an invalid header value
    Request(http::Error),
    /// Failure constructing the client from its configuration, e.g. bad TLS
    /// trust material or an unparseable endpoint
    Config(io::Error),
    /// The api server responded with a non-success status
    Http(http::StatusCode),
}

impl Error {
    pub fn http(status: http::StatusCode) -> Error {
        Error::Http(status)
    }

    pub fn is_http_status(&self, code: u16) -> bool {
        match self {
            Error::Http(ref status) => status.as_u16() == code,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.is_http_status(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.is_http_status(409)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "Io Error: {}", e),
            Error::Serde(ref e) => write!(f, "(De)Serialization error: {}", e),
            Error::Request(ref e) => write!(f, "Invalid request: {}", e),
            Error::Config(ref e) => write!(f, "Client configuration error: {}", e),
            Error::Http(ref status) => write!(f, "Http Error: {}", status),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e as &(dyn std::error::Error + 'static)),
            Error::Serde(e) => Some(e as &(dyn std::error::Error + 'static)),
            Error::Request(e) => Some(e as &(dyn std::error::Error + 'static)),
            Error::Config(e) => Some(e as &(dyn std::error::Error + 'static)),
            Error::Http(_) => None,
        }
    }
}

impl From<hyper::Error> for Error {
    fn from(e: hyper::Error) -> Error {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Error {
        Error::Request(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Config(e)
    }
}
