//! The http adapter: turns a `(method, path, body, options)` tuple into a
//! request against the configured api server and hands back the response body
//! as a string. Url versioning, default headers, and TLS trust material all
//! live here; everything above this module deals only in paths and bodies.

mod request;

pub use self::request::RequestOptions;

use crate::config::{CAData, ClientConfig, Credentials};
use crate::error::Error;

use futures_util::future::BoxFuture;
use http::{Method, Request, Response};
use hyper::client::{Client as HyperClient, HttpConnector};
use hyper::Body;
use hyper_openssl::HttpsConnector;
use openssl::pkey::PKey;
use openssl::ssl::{SslConnector, SslConnectorBuilder, SslMethod, SslVerifyMode};
use openssl::x509::X509;

use std::fs::File;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Instant;

/// Abstract request capability. `Client` is the hyper-backed implementation;
/// tests substitute their own. The returned future is single-shot: it
/// resolves once with the response body (`None` when the response had no
/// body) or with whatever error the transport raised, unmodified.
pub trait HttpClient: Send + Sync + 'static {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> BoxFuture<'static, Result<Option<String>, Error>>;
}

#[derive(Debug)]
struct ClientInner {
    http_client: HyperClient<HttpsConnector<HttpConnector>>,
    config: ClientConfig,
}

/// The hyper-backed http adapter. Cheap to clone; all clones share one
/// connection pool and one immutable `ClientConfig`, so no synchronization is
/// needed across in-flight requests.
#[derive(Debug, Clone)]
pub struct Client(Arc<ClientInner>);

impl Client {
    pub fn new(mut config: ClientConfig) -> Result<Client, Error> {
        url::Url::parse(config.api_server_endpoint.as_str()).map_err(|err| {
            Error::Config(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Invalid api server endpoint '{}': {}",
                    config.api_server_endpoint, err
                ),
            ))
        })?;

        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let ssl = build_ssl_connector(&mut config).map_err(Error::Config)?;
        let https = HttpsConnector::with_connector(http, ssl)
            .map_err(|err| Error::Config(io::Error::new(io::ErrorKind::Other, err)))?;
        let http_client = HyperClient::builder().build(https);

        Ok(Client(Arc::new(ClientInner {
            http_client,
            config,
        })))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.0.config
    }

    /// Executes a request and returns the response body, if any. The path is
    /// prefixed with `/api/<version>` unless it already starts with `/api`;
    /// default headers (`Content-Type: application/json`, the configured
    /// user agent, and `Authorization` for header-based credentials) are
    /// merged with the caller's options. A successful response with an empty
    /// body yields `Ok(None)`; a non-success status yields `Error::Http`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<Option<String>, Error> {
        let req = request::build_request(&self.0.config, method, path, body, &options)?;
        let response = self.execute(req).await?;
        Client::read_body(response).await
    }

    async fn execute(&self, req: Request<Body>) -> Result<Response<Body>, Error> {
        let method = req.method().to_string();
        let uri = req.uri().to_string();
        let start_time = Instant::now();

        log::debug!("Starting {} request to: {}", method, uri);
        let result = self.0.http_client.request(req).await;
        let duration = start_time.elapsed().as_millis();
        match result {
            Ok(resp) => {
                log::debug!(
                    "Response status received for {} to: {}, status: {}, duration: {}ms",
                    method,
                    uri,
                    resp.status().as_u16(),
                    duration
                );
                Ok(resp)
            }
            Err(err) => {
                log::error!(
                    "Failed to execute {} request to: {}, err: {}",
                    method,
                    uri,
                    err
                );
                Err(err.into())
            }
        }
    }

    async fn read_body(response: Response<Body>) -> Result<Option<String>, Error> {
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;

        if !status.is_success() {
            if let Ok(as_str) = std::str::from_utf8(body.as_ref()) {
                log::error!("Response status: {}, body: {}", status, as_str);
            } else {
                log::error!(
                    "Response status: {}, binary body with {} bytes",
                    status,
                    body.len()
                );
            }
            return Err(Error::http(status));
        }

        if body.is_empty() {
            Ok(None)
        } else {
            let contents = String::from_utf8_lossy(body.as_ref()).into_owned();
            log::trace!("Got response body: {}", contents);
            Ok(Some(contents))
        }
    }
}

impl HttpClient for Client {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> BoxFuture<'static, Result<Option<String>, Error>> {
        let client = self.clone();
        let path = path.to_owned();
        Box::pin(async move { client.request(method, path.as_str(), body, options).await })
    }
}

/// Blocking wrapper around `Client` for callers without a runtime of their
/// own. Each call drives the same async code path to completion, so the two
/// variants return identical results for identical inputs.
pub struct BlockingClient {
    runtime: tokio::runtime::Runtime,
    client: Client,
}

impl BlockingClient {
    pub fn new(config: ClientConfig) -> Result<BlockingClient, Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Config)?;
        let client = Client::new(config)?;
        Ok(BlockingClient { runtime, client })
    }

    pub fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<Option<String>, Error> {
        self.runtime
            .block_on(self.client.request(method, path, body, options))
    }

    /// The underlying async client, for handing to a `NamespaceClient` or
    /// sharing with async code.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

fn build_ssl_connector(config: &mut ClientConfig) -> io::Result<SslConnectorBuilder> {
    let mut ssl = SslConnector::builder(SslMethod::tls())?;
    // enable http2 using alpn
    ssl.set_alpn_protos(b"\x02h2\x08http/1.1")?;

    match config.ca_data.take() {
        Some(CAData::Contents(contents)) => {
            // inline CA certs, as they appear in a kubeconfig, are base64 PEM
            // and get added to the trust store one by one
            let decoded = base64::decode(&contents).map_err(|err| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!(
                        "Invalid base64 content of certificate-authority-data: {}",
                        err
                    ),
                )
            })?;
            let certs = X509::stack_from_pem(decoded.as_slice())?;
            let cert_store = ssl.cert_store_mut();
            for cert in certs {
                cert_store.add_cert(cert)?;
            }
        }
        Some(CAData::File(path)) => {
            ssl.set_ca_file(path.as_str())?;
        }
        None => {}
    }

    match config.credentials {
        Some(Credentials::PemPath {
            ref certificate_path,
            ref private_key_path,
        }) => {
            let mut contents = vec![];
            File::open(certificate_path)?.read_to_end(&mut contents)?;
            let cert = X509::from_pem(contents.as_slice())?;

            contents.clear();
            File::open(private_key_path)?.read_to_end(&mut contents)?;
            let pkey = PKey::private_key_from_pem(contents.as_slice())?;

            install_client_cert(&mut ssl, &cert, &pkey)?;
        }
        Some(Credentials::Pem {
            ref certificate_base64,
            ref private_key_base64,
        }) => {
            let decoded_cert = base64::decode(certificate_base64).map_err(|err| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Invalid base64 content of client-certificate-data: {}", err),
                )
            })?;
            let decoded_key = base64::decode(private_key_base64).map_err(|err| {
                io::Error::new(
                    io::ErrorKind::Other,
                    format!("Invalid base64 content of client-key-data: {}", err),
                )
            })?;
            let cert = X509::from_pem(decoded_cert.as_slice())?;
            let pkey = PKey::private_key_from_pem(decoded_key.as_slice())?;
            install_client_cert(&mut ssl, &cert, &pkey)?;
        }
        _ => {}
    }

    if config.verify_ssl_certs {
        ssl.set_verify(SslVerifyMode::PEER);
    } else {
        log::warn!("TLS Certificate verification has been disabled! All connections to the Kubernetes api server will be insecure!");
        ssl.set_verify(SslVerifyMode::NONE);
    }

    Ok(ssl)
}

fn install_client_cert(
    ssl: &mut SslConnectorBuilder,
    cert: &X509,
    pkey: &PKey<openssl::pkey::Private>,
) -> io::Result<()> {
    ssl.set_certificate(&**cert)?; // X509 derefs to &X509Ref
    ssl.set_private_key(&**pkey)?;
    // ensures that the provided private key and certificate actually go together
    ssl.check_private_key()?;
    Ok(())
}
