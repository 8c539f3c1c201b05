//! Namespace-scoped access to resources. A `NamespaceClient` hands out one
//! `Repository` per resource type; each repository maps the usual CRUD verbs
//! onto http adapter calls against `/namespaces/<ns>/<plural>` paths, leaving
//! url versioning and headers to the adapter.

use crate::error::Error;
use crate::http::{HttpClient, RequestOptions};
use crate::k8s_types::{self, K8sType};

use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use std::sync::Arc;

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ListMeta {
    #[serde(rename = "resourceVersion")]
    pub resource_version: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ObjectList<T> {
    pub metadata: ListMeta,
    pub items: Vec<T>,
}

/// The capability set a namespace-scoped caller depends on: one repository
/// accessor per resource type. Purely structural; no behavior lives at this
/// layer.
pub trait NamespaceClient {
    fn pods(&self) -> Repository;
    fn services(&self) -> Repository;
    fn replication_controllers(&self) -> Repository;
    fn secrets(&self) -> Repository;
    fn service_accounts(&self) -> Repository;
    fn persistent_volume_claims(&self) -> Repository;
}

/// Concrete `NamespaceClient` backed by an http adapter.
#[derive(Clone)]
pub struct HttpNamespaceClient {
    http: Arc<dyn HttpClient>,
    namespace: String,
}

impl HttpNamespaceClient {
    pub fn new(http: Arc<dyn HttpClient>, namespace: impl Into<String>) -> HttpNamespaceClient {
        HttpNamespaceClient {
            http,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// A repository for an arbitrary type, for resources beyond the built-in
    /// accessors
    pub fn repository(&self, k8s_type: &'static K8sType) -> Repository {
        Repository::new(self.http.clone(), self.namespace.clone(), k8s_type)
    }
}

impl NamespaceClient for HttpNamespaceClient {
    fn pods(&self) -> Repository {
        self.repository(k8s_types::core::v1::Pod)
    }

    fn services(&self) -> Repository {
        self.repository(k8s_types::core::v1::Service)
    }

    fn replication_controllers(&self) -> Repository {
        self.repository(k8s_types::core::v1::ReplicationController)
    }

    fn secrets(&self) -> Repository {
        self.repository(k8s_types::core::v1::Secret)
    }

    fn service_accounts(&self) -> Repository {
        self.repository(k8s_types::core::v1::ServiceAccount)
    }

    fn persistent_volume_claims(&self) -> Repository {
        self.repository(k8s_types::core::v1::PersistentVolumeClaim)
    }
}

/// CRUD operations for one resource type within one namespace. Bodies are
/// `serde_json::Value`s; decoding into concrete structs is left to callers.
#[derive(Clone)]
pub struct Repository {
    http: Arc<dyn HttpClient>,
    namespace: String,
    k8s_type: &'static K8sType,
}

impl Repository {
    pub fn new(
        http: Arc<dyn HttpClient>,
        namespace: impl Into<String>,
        k8s_type: &'static K8sType,
    ) -> Repository {
        Repository {
            http,
            namespace: namespace.into(),
            k8s_type,
        }
    }

    pub fn k8s_type(&self) -> &'static K8sType {
        self.k8s_type
    }

    pub async fn list(&self, label_selector: Option<&str>) -> Result<ObjectList<Value>, Error> {
        let mut path = self.collection_path();
        if let Some(selector) = label_selector {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .append_pair("labelSelector", selector)
                .finish();
            path.push('?');
            path.push_str(query.as_str());
        }
        let body = self
            .http
            .request(Method::GET, path.as_str(), None, RequestOptions::new())
            .await?;
        decode(body)
    }

    /// Gets the named resource, converting a 404 response into a `None`
    pub async fn get(&self, name: &str) -> Result<Option<Value>, Error> {
        let path = self.named_path(name);
        let result = self
            .http
            .request(Method::GET, path.as_str(), None, RequestOptions::new())
            .await;
        match result {
            Ok(body) => decode(body).map(Some),
            Err(ref err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn create(&self, resource: &Value) -> Result<Value, Error> {
        let body = serde_json::to_string(resource)?;
        let response = self
            .http
            .request(
                Method::POST,
                self.collection_path().as_str(),
                Some(body),
                RequestOptions::new(),
            )
            .await?;
        decode(response)
    }

    /// Replaces the named resource (PUT). The passed object must carry the
    /// `resourceVersion` of the version it replaces, per the usual apiserver
    /// optimistic concurrency rules.
    pub async fn update(&self, name: &str, resource: &Value) -> Result<Value, Error> {
        let body = serde_json::to_string(resource)?;
        let path = self.named_path(name);
        let response = self
            .http
            .request(Method::PUT, path.as_str(), Some(body), RequestOptions::new())
            .await?;
        decode(response)
    }

    pub async fn delete(&self, name: &str) -> Result<(), Error> {
        log::info!(
            "Deleting {} '{}' in namespace '{}'",
            self.k8s_type.kind,
            name,
            self.namespace
        );
        let path = self.named_path(name);
        let result = self
            .http
            .request(Method::DELETE, path.as_str(), None, RequestOptions::new())
            .await;
        match result {
            Ok(_) => Ok(()),
            // 404 means something else already deleted the resource, and 409
            // means the object is already in the process of being deleted;
            // both are fine by us
            Err(ref err) if err.is_not_found() || err.is_conflict() => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn collection_path(&self) -> String {
        format!("/namespaces/{}/{}", self.namespace, self.k8s_type.plural_kind)
    }

    fn named_path(&self, name: &str) -> String {
        format!("{}/{}", self.collection_path(), name)
    }
}

fn decode<T: DeserializeOwned>(body: Option<String>) -> Result<T, Error> {
    let contents = body.unwrap_or_default();
    serde_json::from_str(contents.as_str()).map_err(Into::into)
}
