//! Client configuration. A `ClientConfig` is created once, is immutable for
//! the lifetime of the client built from it, and parameterizes every request:
//! the api server endpoint, the api version used for url construction, the
//! credentials attached to each request, and the TLS trust material.

mod kubeconfig;

pub use self::kubeconfig::{load_kubeconfig, KubeConfig, KubeConfigError};

use std::fs::File;
use std::io::Read;
use std::path::Path;

const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const API_SERVER_HOSTNAME: &str = "kubernetes.default.svc";

/// The api version used when none is specified, and by both of the high-level
/// constructors (`from_service_account` and `from_kubeconfig`).
pub const DEFAULT_API_VERSION: &str = "v1";

/// Certificate authority data used to verify the api server's certificate.
/// Either the raw base64 contents, as they appear inline in a kubeconfig or a
/// secret, or a path to a PEM file on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum CAData {
    Contents(String),
    File(String),
}

/// Credentials presented to the api server. Header-based credentials (bearer
/// tokens, basic auth) ride along as a default `Authorization` header on every
/// request; PEM credentials become the TLS client certificate, installed on
/// the connector when the client is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    /// A complete `Authorization` header value, e.g. `Bearer abc123`
    Header(String),
    /// Client certificate and key as base64-encoded PEM contents
    Pem {
        certificate_base64: String,
        private_key_base64: String,
    },
    /// Paths to PEM files holding the client certificate and key
    PemPath {
        certificate_path: String,
        private_key_path: String,
    },
}

impl Credentials {
    pub fn bearer_token(token: impl AsRef<str>) -> Credentials {
        Credentials::Header(format!("Bearer {}", token.as_ref().trim()))
    }

    pub fn basic(username: impl AsRef<str>, password: impl AsRef<str>) -> Credentials {
        let creds = format!("{}:{}", username.as_ref(), password.as_ref());
        Credentials::Header(format!("Basic {}", base64::encode(&creds)))
    }

    /// The `Authorization` header value for these credentials, if they are
    /// header-based
    pub fn header_value(&self) -> Option<&str> {
        match self {
            Credentials::Header(ref value) => Some(value.as_str()),
            _ => None,
        }
    }
}

/// Everything needed to construct a client. All fields are read-only once the
/// client is created, so no synchronization is needed across in-flight
/// requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Root endpoint of the api server, e.g. `https://10.0.0.1:6443`
    pub api_server_endpoint: String,
    /// Api version spliced into request paths, e.g. `v1`
    pub api_version: String,
    /// Credentials attached to every request, if any
    pub credentials: Option<Credentials>,
    /// CA trust material for verifying the api server certificate
    pub ca_data: Option<CAData>,
    /// Value of the `User-Agent` header sent with every request
    pub user_agent: String,
    /// Whether to verify the api server's TLS certificate. Leave this on
    /// unless you really know what you're doing
    pub verify_ssl_certs: bool,
}

impl ClientConfig {
    /// Creates a minimal config for the given endpoint and api version, with
    /// no credentials and no extra trust material. Useful for talking to a
    /// local proxy (`kubectl proxy`) or in tests.
    pub fn new(
        api_server_endpoint: impl Into<String>,
        api_version: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> ClientConfig {
        ClientConfig {
            api_server_endpoint: api_server_endpoint.into(),
            api_version: api_version.into(),
            credentials: None,
            ca_data: None,
            user_agent: user_agent.into(),
            verify_ssl_certs: true,
        }
    }

    /// Creates a config from the pod's service account, for clients running
    /// in-cluster. Reads the token and CA certificate from the usual paths
    /// under `/var/run/secrets/kubernetes.io/serviceaccount/` and points the
    /// client at `kubernetes.default.svc`.
    pub fn from_service_account(user_agent: impl Into<String>) -> std::io::Result<ClientConfig> {
        let mut token_file = File::open(SERVICE_ACCOUNT_TOKEN_PATH)?;
        let mut token = String::new();
        token_file.read_to_string(&mut token)?;

        let ca_data = if Path::new(SERVICE_ACCOUNT_CA_PATH).exists() {
            Some(CAData::File(SERVICE_ACCOUNT_CA_PATH.to_owned()))
        } else {
            None
        };

        Ok(ClientConfig {
            api_server_endpoint: format!("https://{}", API_SERVER_HOSTNAME),
            api_version: DEFAULT_API_VERSION.to_owned(),
            credentials: Some(Credentials::bearer_token(&token)),
            ca_data,
            user_agent: user_agent.into(),
            verify_ssl_certs: true,
        })
    }

    /// Creates a config from the kubeconfig file, honoring the `KUBECONFIG`
    /// environment variable and falling back to `~/.kube/config`. Uses the
    /// file's current context to select the cluster and user.
    pub fn from_kubeconfig(user_agent: impl Into<String>) -> Result<ClientConfig, KubeConfigError> {
        kubeconfig::load_from_kubeconfig(user_agent.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic_credentials_are_base64_encoded() {
        let creds = Credentials::basic("jane", "s3cret");
        let expected = format!("Basic {}", base64::encode("jane:s3cret"));
        assert_eq!(Some(expected.as_str()), creds.header_value());
    }

    #[test]
    fn bearer_token_trims_trailing_whitespace() {
        // service account token files frequently end with a newline
        let creds = Credentials::bearer_token("abc123\n");
        assert_eq!(Some("Bearer abc123"), creds.header_value());
    }

    #[test]
    fn pem_credentials_have_no_header_value() {
        let creds = Credentials::Pem {
            certificate_base64: "Zm9v".to_owned(),
            private_key_base64: "YmFy".to_owned(),
        };
        assert!(creds.header_value().is_none());
    }
}
