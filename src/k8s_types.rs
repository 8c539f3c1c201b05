//! Static descriptors for the resource types this client can address. A
//! `K8sType` carries just enough information to build request paths and to
//! stamp `apiVersion`/`kind` onto outgoing objects. We use `&'static str` for
//! all of the fields so that it's easy to pass references around without
//! copying. You can define your own types simply by declaring a static:
//!
//! ```no_run
//! use kube_rest_client::k8s_types::K8sType;
//!
//! #[allow(non_upper_case_globals)]
//! pub static ConfigMap: &K8sType = &K8sType {
//!     api_version: "v1",
//!     kind: "ConfigMap",
//!     plural_kind: "configmaps",
//! };
//! ```

use std::fmt::{self, Display};
use std::hash::{self, Hash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct K8sType {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub plural_kind: &'static str,
}

impl Hash for K8sType {
    fn hash<H: hash::Hasher>(&self, hasher: &mut H) {
        self.api_version.hash(hasher);
        self.kind.hash(hasher);
    }
}

impl Display for K8sType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.api_version, self.plural_kind)
    }
}

/// Creates a `&'static K8sType` at runtime **by leaking memory**. This is
/// totally fine as long as it's only done once on application startup, but you
/// definitely want to avoid repeated calls to define the same type.
pub fn define_type(api_version: String, kind: String, plural_kind: String) -> &'static K8sType {
    fn leak_str(s: String) -> &'static str {
        Box::leak(s.into_boxed_str())
    }

    let k8s_type = K8sType {
        api_version: leak_str(api_version),
        kind: leak_str(kind),
        plural_kind: leak_str(plural_kind),
    };
    log::info!("Dynamically defining {:?}", k8s_type);
    Box::leak(Box::new(k8s_type))
}

macro_rules! k8s_type {
    ($ref_name:ident, $api_version:expr, $kind:expr, $plural_kind:expr) => {
        #[allow(non_upper_case_globals)]
        pub static $ref_name: &crate::k8s_types::K8sType = &crate::k8s_types::K8sType {
            api_version: $api_version,
            kind: $kind,
            plural_kind: $plural_kind,
        };
    };
}

macro_rules! def_core_types {
    ($( $version:ident => [
        $( $kind:ident ~ $plural_kind:ident ),* $(,)?
    ]),*) => {
        pub mod core {
            $(pub mod $version {
                $(
                    k8s_type!($kind, stringify!($version), stringify!($kind), stringify!($plural_kind));
                )*
            })*
        }
    };
}

def_core_types! {
    v1 => [
        Namespace ~ namespaces,
        Node ~ nodes,
        Pod ~ pods,
        ReplicationController ~ replicationcontrollers,
        Event ~ events,
        Service ~ services,
        Endpoints ~ endpoints,
        Secret ~ secrets,
        ConfigMap ~ configmaps,
        PersistentVolumeClaim ~ persistentvolumeclaims,
        PersistentVolume ~ persistentvolumes,
        ServiceAccount ~ serviceaccounts,
    ]
}
