//! kube-rs backed [`Provisioner`] and [`ClusterQuery`]
//!
//! All kinds go through `Api<DynamicObject>` so the CRDs do not need to be
//! compiled into the crate to be applied.

use super::{ClusterQuery, ObjectManifest, ObjectRef, ObjectSnapshot, Provisioner, ResourceKind};
use crate::constants::FIELD_MANAGER;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use kube::api::{Api, ApiResource, DeleteParams, ListParams, PostParams};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::Client;
use std::fmt;
use std::sync::Once;
use tracing::{debug, info};

static RUSTLS_INIT: Once = Once::new();

/// Install the ring crypto provider for rustls
///
/// Must run before the first client is built. Safe to call more than once.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Err means another provider is already installed, which is fine
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed");
        }
    });
}

/// Control-plane collaborator backed by a `kube::Client`
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeCluster").finish_non_exhaustive()
    }
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with the ambient kubeconfig or in-cluster service account
    pub async fn connect() -> Result<Self> {
        init_rustls();
        let client = Client::try_default().await?;
        info!("Connected to Kubernetes API server");
        Ok(Self::new(client))
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api(&self, kind: &ResourceKind, namespace: Option<&str>) -> Api<DynamicObject> {
        let gvk = GroupVersionKind {
            group: kind.group.to_string(),
            version: kind.version.to_string(),
            kind: kind.kind.to_string(),
        };
        let ar = ApiResource::from_gvk_with_plural(&gvk, &kind.plural);
        match namespace {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }

    fn snapshot(kind: &ResourceKind, object: &DynamicObject) -> Result<ObjectSnapshot> {
        ObjectSnapshot::from_value(kind.clone(), serde_json::to_value(object)?)
    }
}

#[async_trait]
impl Provisioner for KubeCluster {
    async fn apply(&self, manifest: &ObjectManifest) -> Result<ObjectSnapshot> {
        let api = self.api(&manifest.kind, manifest.namespace.as_deref());
        let mut desired: DynamicObject = serde_json::from_value(manifest.body.clone())?;
        desired.metadata.resource_version = None;

        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PostParams::default()
        };

        let stored = match api.get_opt(&manifest.name).await? {
            Some(existing) => {
                // Whole-object replace needs the current resourceVersion
                desired.metadata.resource_version = existing.metadata.resource_version;
                debug!("Replacing {}", manifest.object_ref());
                api.replace(&manifest.name, &params, &desired).await?
            }
            None => {
                debug!("Creating {}", manifest.object_ref());
                api.create(&params, &desired).await?
            }
        };
        Self::snapshot(&manifest.kind, &stored)
    }

    async fn delete(&self, target: &ObjectRef) -> Result<()> {
        let api = self.api(&target.kind, target.namespace.as_deref());
        match api.delete(&target.name, &DeleteParams::background()).await {
            Ok(_) => {
                debug!("Deletion of {} accepted", target);
                Ok(())
            }
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Err(HarnessError::not_found(
                &target.kind.kind,
                target.namespace.as_deref().unwrap_or_default(),
                &target.name,
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ClusterQuery for KubeCluster {
    async fn get_by_name(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectSnapshot>> {
        let api = self.api(kind, Some(namespace));
        match api.get_opt(name).await? {
            Some(object) => Ok(Some(Self::snapshot(kind, &object)?)),
            None => Ok(None),
        }
    }

    async fn list_by_name_prefix(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSnapshot>> {
        let api = self.api(kind, Some(namespace));
        let list = api.list(&ListParams::default()).await?;
        list.items
            .iter()
            .filter(|object| {
                object
                    .metadata
                    .name
                    .as_deref()
                    .is_some_and(|name| name.starts_with(prefix))
            })
            .map(|object| Self::snapshot(kind, object))
            .collect()
    }
}
