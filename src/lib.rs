//! A thin client for the Kubernetes REST api: an http adapter that speaks the
//! apiserver's url/header/body contract, and namespace-scoped repositories
//! that map CRUD verbs onto it.
//!
//! To get started, build a `ClientConfig` (from a kubeconfig file, from the
//! pod's service account, or by hand), wrap it in a `Client`, and hand that to
//! an `HttpNamespaceClient`:
//!
//! ```no_run
//! use kube_rest_client::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_kubeconfig("my-tool")?;
//! let client = Client::new(config)?;
//! let namespace = HttpNamespaceClient::new(Arc::new(client), "team-a");
//!
//! let pods = namespace.pods().list(Some("app=web")).await?;
//! for pod in pods.items.iter() {
//!     println!("{}", pod["metadata"]["name"]);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! There is no retry, no backoff, and no watch machinery here: transport
//! failures and non-2xx statuses surface unmodified to the caller, and the
//! policy for dealing with them belongs one layer up.

#[macro_use]
extern crate serde_derive;

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod k8s_types;

pub use serde;
pub use serde_json;
pub use serde_yaml;

pub mod prelude {
    pub use crate::client::{HttpNamespaceClient, NamespaceClient, ObjectList, Repository};
    pub use crate::config::{CAData, ClientConfig, Credentials};
    pub use crate::error::Error;
    pub use crate::http::{BlockingClient, Client, HttpClient, RequestOptions};
    pub use crate::k8s_types::{self, K8sType};
    pub use serde::{Deserialize, Serialize};
}
