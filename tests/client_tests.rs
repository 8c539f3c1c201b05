//! End-to-end tests against an in-process mock api server. Each test starts
//! its own hyper server on a random local port and points a real client at
//! it, so the full path (url construction, header merging, body handling)
//! is exercised over actual sockets.

use kube_rest_client::prelude::*;

use http::Method;
use hyper::server::Server;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response};

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

#[derive(Clone)]
struct MockApiServer {
    address: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockApiServer {
    /// Starts the server on a random port on a background thread. The thread
    /// is detached; it dies with the test process.
    fn start() -> MockApiServer {
        let _ = env_logger::try_init();
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();
        let (addr_tx, addr_rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build server runtime");
            runtime.block_on(async move {
                let make_svc = make_service_fn(move |_| {
                    let recorded = recorded.clone();
                    async move {
                        Ok::<_, hyper::Error>(service_fn(move |request| {
                            handle_request(recorded.clone(), request)
                        }))
                    }
                });
                let address: SocketAddr = ([127, 0, 0, 1], 0).into();
                let server = Server::bind(&address).serve(make_svc);
                addr_tx
                    .send(server.local_addr())
                    .expect("failed to report server address");
                if let Err(err) = server.await {
                    panic!("mock api server failed: {}", err);
                }
            });
        });

        let address = addr_rx.recv().expect("server failed to start");
        MockApiServer { address, requests }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(
            format!("http://{}", self.address),
            "v1",
            "kube-rest-client-tests",
        );
        config.credentials = Some(Credentials::bearer_token("test-token"));
        config
    }

    fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle_request(
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    request: Request<Body>,
) -> Result<Response<Body>, hyper::Error> {
    let method = request.method().to_string();
    let path = request.uri().path_and_query().unwrap().to_string();
    let headers = request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body_bytes = hyper::body::to_bytes(request.into_body()).await?;
    let body = String::from_utf8_lossy(body_bytes.as_ref()).into_owned();

    recorded.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        headers,
        body: body.clone(),
    });

    let response = route(method.as_str(), path.as_str(), body);
    Ok(response)
}

fn route(method: &str, path: &str, body: String) -> Response<Body> {
    match (method, path) {
        ("GET", p) if p.ends_with("/secrets/empty") => Response::builder()
            .status(200)
            .body(Body::empty())
            .unwrap(),
        ("GET", p) if p.ends_with("/pods/missing") => status_response(404, "NotFound"),
        ("DELETE", p) if p.ends_with("/gone") => status_response(404, "NotFound"),
        ("DELETE", _) => Response::builder().status(200).body(Body::empty()).unwrap(),
        ("POST", _) | ("PUT", _) => Response::builder()
            .status(201)
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        ("GET", p) if p.contains("/pods?") || p.ends_with("/pods") => Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(Body::from(
                r#"{"kind":"PodList","metadata":{"resourceVersion":"42"},"items":[{"metadata":{"name":"pod-a"}}]}"#,
            ))
            .unwrap(),
        ("GET", _) => Response::builder()
            .status(200)
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"kind":"Pod","metadata":{"name":"pod-a"}}"#))
            .unwrap(),
        _ => status_response(404, "NotFound"),
    }
}

fn status_response(code: u16, reason: &str) -> Response<Body> {
    let body = format!(
        r#"{{"kind":"Status","status":"Failure","reason":"{}","code":{}}}"#,
        reason, code
    );
    Response::builder()
        .status(code)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(future)
}

#[test]
fn unversioned_paths_are_prefixed_on_the_wire() {
    let server = MockApiServer::start();
    let client = Client::new(server.client_config()).expect("failed to create client");

    run(client.request(
        Method::GET,
        "/namespaces/test/pods",
        None,
        RequestOptions::new(),
    ))
    .expect("request failed");

    let recorded = server.recorded();
    assert_eq!("/api/v1/namespaces/test/pods", recorded[0].path.as_str());
}

#[test]
fn paths_already_under_api_are_not_rewritten() {
    let server = MockApiServer::start();
    let client = Client::new(server.client_config()).expect("failed to create client");

    run(client.request(
        Method::GET,
        "/api/v1/namespaces/test/pods",
        None,
        RequestOptions::new(),
    ))
    .expect("request failed");

    let recorded = server.recorded();
    assert_eq!("/api/v1/namespaces/test/pods", recorded[0].path.as_str());
}

#[test]
fn default_and_caller_headers_both_reach_the_wire() {
    let server = MockApiServer::start();
    let client = Client::new(server.client_config()).expect("failed to create client");

    run(client.request(
        Method::POST,
        "/namespaces/test/pods",
        Some(r#"{"a":1}"#.to_owned()),
        RequestOptions::new().header("X-Request-Id", "abc-123"),
    ))
    .expect("request failed");

    let recorded = server.recorded();
    let headers = &recorded[0].headers;
    assert_eq!(Some(&"application/json".to_owned()), headers.get("content-type"));
    assert_eq!(Some(&"Bearer test-token".to_owned()), headers.get("authorization"));
    assert_eq!(
        Some(&"kube-rest-client-tests".to_owned()),
        headers.get("user-agent")
    );
    assert_eq!(Some(&"abc-123".to_owned()), headers.get("x-request-id"));
    assert_eq!(r#"{"a":1}"#, recorded[0].body.as_str());
}

#[test]
fn blocking_and_async_requests_return_identical_bodies() {
    let server = MockApiServer::start();
    let config = server.client_config();

    let blocking = BlockingClient::new(config.clone()).expect("failed to create blocking client");
    let from_blocking = blocking
        .request(
            Method::GET,
            "/namespaces/test/pods",
            None,
            RequestOptions::new(),
        )
        .expect("blocking request failed");

    let client = Client::new(config).expect("failed to create client");
    let from_async = run(client.request(
        Method::GET,
        "/namespaces/test/pods",
        None,
        RequestOptions::new(),
    ))
    .expect("async request failed");

    assert!(from_blocking.is_some());
    assert_eq!(from_blocking, from_async);
}

#[test]
fn an_empty_response_body_is_returned_as_none() {
    let server = MockApiServer::start();
    let client = Client::new(server.client_config()).expect("failed to create client");

    let result = run(client.request(
        Method::GET,
        "/namespaces/test/secrets/empty",
        None,
        RequestOptions::new(),
    ))
    .expect("request failed");

    assert_eq!(None, result);
}

#[test]
fn repository_verbs_map_onto_the_expected_requests() {
    let server = MockApiServer::start();
    let client = Client::new(server.client_config()).expect("failed to create client");
    let namespace = HttpNamespaceClient::new(Arc::new(client), "test");
    let pods = namespace.pods();

    let created = run(pods.create(&serde_json::json!({"metadata": {"name": "pod-a"}})))
        .expect("create failed");
    assert_eq!("pod-a", created["metadata"]["name"]);

    let listed = run(pods.list(Some("app=web"))).expect("list failed");
    assert_eq!(1, listed.items.len());
    assert_eq!(Some("42".to_owned()), listed.metadata.resource_version);

    let fetched = run(pods.get("pod-a")).expect("get failed");
    assert!(fetched.is_some());

    let missing = run(pods.get("missing")).expect("get of a missing pod failed");
    assert!(missing.is_none());

    run(pods.delete("gone")).expect("delete should tolerate a 404");

    let recorded = server.recorded();
    let summary: Vec<(String, String)> = recorded
        .iter()
        .map(|r| (r.method.clone(), r.path.clone()))
        .collect();
    assert_eq!(
        vec![
            ("POST".to_owned(), "/api/v1/namespaces/test/pods".to_owned()),
            (
                "GET".to_owned(),
                "/api/v1/namespaces/test/pods?labelSelector=app%3Dweb".to_owned()
            ),
            ("GET".to_owned(), "/api/v1/namespaces/test/pods/pod-a".to_owned()),
            (
                "GET".to_owned(),
                "/api/v1/namespaces/test/pods/missing".to_owned()
            ),
            (
                "DELETE".to_owned(),
                "/api/v1/namespaces/test/pods/gone".to_owned()
            ),
        ],
        summary
    );
}
