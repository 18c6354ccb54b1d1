//! # Cluster Collaborators
//!
//! Interfaces the harness consumes from the control plane, and the object
//! model that travels across them.
//!
//! - [`Provisioner`]: create-or-replace and delete of whole objects
//! - [`ClusterQuery`]: lookups by name and by name prefix
//!
//! Every lookup goes to the control plane; nothing here caches objects.
//! [`KubeCluster`] implements both traits on top of `kube::Api<DynamicObject>`.

mod kube_cluster;
mod object;

pub use kube_cluster::{init_rustls, KubeCluster};
pub use object::{ObjectManifest, ObjectRef, ObjectSnapshot, ResourceKind};

use crate::error::Result;
use crate::status::StatusCondition;
use async_trait::async_trait;
use std::sync::Arc;

/// Declarative apply and delete
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the object, or replace it wholesale if it already exists
    async fn apply(&self, manifest: &ObjectManifest) -> Result<ObjectSnapshot>;

    /// Request deletion; returns once the control plane accepted the request
    async fn delete(&self, target: &ObjectRef) -> Result<()>;
}

/// Read access to the control plane's resource store
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    async fn get_by_name(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectSnapshot>>;

    async fn list_by_name_prefix(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSnapshot>>;

    /// Fresh status conditions, or `None` when the object does not exist
    async fn status_conditions(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Vec<StatusCondition>>> {
        match self.get_by_name(kind, namespace, name).await? {
            Some(snapshot) => Ok(Some(snapshot.status_conditions()?)),
            None => Ok(None),
        }
    }

    async fn exists(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Result<bool> {
        Ok(self.get_by_name(kind, namespace, name).await?.is_some())
    }
}

#[async_trait]
impl<T: Provisioner + ?Sized> Provisioner for Arc<T> {
    async fn apply(&self, manifest: &ObjectManifest) -> Result<ObjectSnapshot> {
        (**self).apply(manifest).await
    }

    async fn delete(&self, target: &ObjectRef) -> Result<()> {
        (**self).delete(target).await
    }
}

#[async_trait]
impl<T: ClusterQuery + ?Sized> ClusterQuery for Arc<T> {
    async fn get_by_name(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectSnapshot>> {
        (**self).get_by_name(kind, namespace, name).await
    }

    async fn list_by_name_prefix(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSnapshot>> {
        (**self).list_by_name_prefix(kind, namespace, prefix).await
    }

    async fn status_conditions(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Vec<StatusCondition>>> {
        (**self).status_conditions(kind, namespace, name).await
    }

    async fn exists(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Result<bool> {
        (**self).exists(kind, namespace, name).await
    }
}
