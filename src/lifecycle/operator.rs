//! # Operator Lifecycle
//!
//! Deploy and undeploy of the operator under test, once per suite.
//!
//! ## Deployment wait
//!
//! Two stages, each with its own deadline:
//!
//! 1. Existence: some naming candidate's Deployment exists. The resolver
//!    fixes the operator name at this point.
//! 2. Readiness: the resolved Deployment has observed its current
//!    generation and has at least `spec.replicas` ready replicas.
//!
//! ## Undeployment wait
//!
//! The Deployment is absent and no pod named after it remains, checked
//! together on every poll.

use crate::clock::{Clock, TokioClock};
use crate::cluster::{ClusterQuery, ObjectManifest, ObjectSnapshot, Provisioner, ResourceKind};
use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::naming::{NamePolicy, Resolution, ResourceNameResolver};
use crate::wait::{wait_until, Observation};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// How the operator gets onto the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
    /// Through the package manager (OLM subscription)
    PackageManaged,
    /// From the operator's install manifests
    ManifestFile,
}

impl FromStr for InstallMethod {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "olm" | "bundle" | "package" | "package-managed" => Ok(InstallMethod::PackageManaged),
            "manifest" | "file" | "manifest-file" => Ok(InstallMethod::ManifestFile),
            other => Err(HarnessError::Configuration(format!(
                "unknown operator install method '{other}'"
            ))),
        }
    }
}

/// Operator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    NotDeployed,
    Deploying,
    Deployed,
    Undeploying,
    Undeployed,
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OperatorState::NotDeployed => "not deployed",
            OperatorState::Deploying => "deploying",
            OperatorState::Deployed => "deployed",
            OperatorState::Undeploying => "undeploying",
            OperatorState::Undeployed => "undeployed",
        };
        f.write_str(text)
    }
}

/// Where the operator runs, what it watches and what it is called
#[derive(Debug)]
pub struct OperatorIdentity {
    deployment_namespace: String,
    is_namespaced: bool,
    watched_namespaces: Vec<String>,
    resolver: ResourceNameResolver,
    install_method: InstallMethod,
}

impl OperatorIdentity {
    /// Namespaced operator watching only its own namespace
    pub fn new(
        deployment_namespace: impl Into<String>,
        install_method: InstallMethod,
        candidates: Vec<String>,
        policy: NamePolicy,
    ) -> Result<Self> {
        let deployment_namespace = deployment_namespace.into();
        Ok(Self {
            watched_namespaces: vec![deployment_namespace.clone()],
            deployment_namespace,
            is_namespaced: true,
            resolver: ResourceNameResolver::new(candidates, policy)?,
            install_method,
        })
    }

    /// Identity for the configured install method and naming
    ///
    /// For manifest installs the Deployment name found in `manifests` is
    /// tried before the conventional candidates.
    pub fn from_config(
        deployment_namespace: impl Into<String>,
        config: &HarnessConfig,
        manifests: &[ObjectManifest],
    ) -> Result<Self> {
        let mut candidates = config.operator_name_candidates();
        if config.operator_install_method == InstallMethod::ManifestFile {
            if let Some(deployment) = manifests
                .iter()
                .find(|m| m.kind.kind == ResourceKind::DEPLOYMENT.kind)
            {
                candidates.retain(|c| c != &deployment.name);
                candidates.insert(0, deployment.name.clone());
            }
        }
        Self::new(
            deployment_namespace,
            config.operator_install_method,
            candidates,
            config.operator_name_policy,
        )
    }

    /// Cluster-wide operator watching `watched_namespaces` (all when empty)
    #[must_use]
    pub fn cluster_wide(mut self, watched_namespaces: Vec<String>) -> Self {
        self.is_namespaced = false;
        self.watched_namespaces = watched_namespaces;
        self
    }

    #[must_use]
    pub fn deployment_namespace(&self) -> &str {
        &self.deployment_namespace
    }

    #[must_use]
    pub fn is_namespaced(&self) -> bool {
        self.is_namespaced
    }

    #[must_use]
    pub fn watched_namespaces(&self) -> &[String] {
        &self.watched_namespaces
    }

    #[must_use]
    pub fn install_method(&self) -> InstallMethod {
        self.install_method
    }

    #[must_use]
    pub fn name_candidates(&self) -> &[String] {
        self.resolver.candidates()
    }

    /// Operator Deployment name, once resolved by a deploy wait
    #[must_use]
    pub fn resolved_name(&self) -> Option<&str> {
        self.resolver.resolved()
    }

    /// Value of the operator's `WATCH_NAMESPACE`
    fn watch_namespace_value(&self) -> String {
        if self.watched_namespaces.is_empty() {
            "*".to_string()
        } else {
            self.watched_namespaces.join(",")
        }
    }
}

/// Kinds that never carry a namespace in operator install manifests
fn is_cluster_scoped(kind: &ResourceKind) -> bool {
    matches!(
        kind.kind.as_ref(),
        "CustomResourceDefinition"
            | "ClusterRole"
            | "ClusterRoleBinding"
            | "Namespace"
            | "ValidatingWebhookConfiguration"
            | "MutatingWebhookConfiguration"
    )
}

/// Deploys and undeploys the operator and tracks its state
#[derive(Debug)]
pub struct OperatorLifecycleController<P, Q, C = TokioClock> {
    provisioner: P,
    query: Q,
    clock: C,
    identity: OperatorIdentity,
    manifests: Vec<ObjectManifest>,
    state: OperatorState,
    poll_interval: Duration,
    timeout: Duration,
}

impl<P, Q, C> OperatorLifecycleController<P, Q, C>
where
    P: Provisioner,
    Q: ClusterQuery,
    C: Clock,
{
    /// `manifests` are applied in order on deploy and deleted in reverse on undeploy
    pub fn new(
        provisioner: P,
        query: Q,
        clock: C,
        identity: OperatorIdentity,
        manifests: Vec<ObjectManifest>,
        config: &HarnessConfig,
    ) -> Self {
        let manifests = manifests
            .into_iter()
            .map(|manifest| prepare_manifest(manifest, &identity))
            .collect();
        Self {
            provisioner,
            query,
            clock,
            identity,
            manifests,
            state: OperatorState::NotDeployed,
            poll_interval: config.poll_interval(),
            timeout: config.operator_timeout(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &OperatorIdentity {
        &self.identity
    }

    #[must_use]
    pub fn state(&self) -> OperatorState {
        self.state
    }

    /// Apply the operator manifests, optionally waiting until it runs
    ///
    /// Only valid once, from `NotDeployed`. `Undeployed` is terminal; a fresh
    /// controller is needed to deploy again.
    pub async fn deploy(&mut self, wait_for_ready: bool) -> Result<()> {
        if self.state != OperatorState::NotDeployed {
            return Err(HarnessError::InvalidState {
                operation: "deploy",
                state: self.state.to_string(),
            });
        }

        self.state = OperatorState::Deploying;
        info!(
            "Deploying operator into namespace {} ({:?}, namespaced={})",
            self.identity.deployment_namespace,
            self.identity.install_method,
            self.identity.is_namespaced
        );
        for manifest in &self.manifests {
            self.provisioner.apply(manifest).await?;
            debug!("Applied {}", manifest.object_ref());
        }

        if wait_for_ready {
            let name = self.wait_for_deployment().await?;
            self.wait_for_deployment_ready(&name).await?;
            info!("Operator {} is ready", name);
        }

        self.state = OperatorState::Deployed;
        Ok(())
    }

    /// Delete the operator manifests, optionally waiting until it is gone
    ///
    /// Objects that are already absent are skipped, so a call that timed out
    /// in `Undeploying` can be repeated to finish teardown.
    pub async fn undeploy(&mut self, wait_for_removal: bool) -> Result<()> {
        if !matches!(
            self.state,
            OperatorState::Deployed | OperatorState::Deploying | OperatorState::Undeploying
        ) {
            return Err(HarnessError::InvalidState {
                operation: "undeploy",
                state: self.state.to_string(),
            });
        }

        self.state = OperatorState::Undeploying;
        info!(
            "Undeploying operator from namespace {}",
            self.identity.deployment_namespace
        );
        for manifest in self.manifests.iter().rev() {
            match self.provisioner.delete(&manifest.object_ref()).await {
                Ok(()) => debug!("Deleted {}", manifest.object_ref()),
                Err(HarnessError::ResourceNotFound { .. }) => {
                    debug!("{} already absent", manifest.object_ref());
                }
                Err(e) => return Err(e),
            }
        }

        if wait_for_removal {
            self.wait_for_operator_stopped().await?;
            info!("Operator stopped");
        }

        self.state = OperatorState::Undeployed;
        Ok(())
    }

    /// First pod of the resolved operator Deployment
    pub async fn operator_pod(&self) -> Result<ObjectSnapshot> {
        let Some(name) = self.identity.resolved_name() else {
            return Err(HarnessError::InvalidState {
                operation: "look up operator pod",
                state: self.state.to_string(),
            });
        };
        let namespace = self.identity.deployment_namespace.as_str();
        self.query
            .list_by_name_prefix(&ResourceKind::POD, namespace, name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HarnessError::not_found(&ResourceKind::POD.kind, namespace, name))
    }

    /// Stage 1: wait until some candidate Deployment exists and fix its name
    async fn wait_for_deployment(&self) -> Result<String> {
        let resolver = &self.identity.resolver;
        let cluster = &self.query;
        let namespace = self.identity.deployment_namespace.as_str();
        let deployment = ResourceKind::DEPLOYMENT;
        let deployment = &deployment;
        wait_until(
            &self.clock,
            format!("waiting for operator deployment in {namespace} to exist"),
            self.poll_interval,
            self.timeout,
            || async move {
                let resolution = resolver
                    .resolve(|name| async move { cluster.exists(deployment, namespace, &name).await })
                    .await?;
                Ok(match resolution {
                    Resolution::Resolved(name) => Observation::Satisfied(name),
                    Resolution::Unresolved => Observation::pending(format!(
                        "none of {:?} exist",
                        resolver.candidates()
                    )),
                })
            },
        )
        .await
    }

    /// Stage 2: wait until the resolved Deployment reports ready replicas
    async fn wait_for_deployment_ready(&self, name: &str) -> Result<()> {
        let cluster = &self.query;
        let namespace = self.identity.deployment_namespace.as_str();
        let deployment = ResourceKind::DEPLOYMENT;
        let deployment = &deployment;
        wait_until(
            &self.clock,
            format!("waiting for operator deployment {namespace}/{name} to be ready"),
            self.poll_interval,
            self.timeout,
            || async move {
                Ok(match cluster.get_by_name(deployment, namespace, name).await? {
                    Some(snapshot) => deployment_readiness(&snapshot.body),
                    None => Observation::pending("deployment not found"),
                })
            },
        )
        .await
    }

    async fn wait_for_operator_stopped(&self) -> Result<()> {
        let cluster = &self.query;
        let namespace = self.identity.deployment_namespace.as_str();
        // Without a resolved name every candidate has to be gone
        let names: Vec<String> = match self.identity.resolved_name() {
            Some(name) => vec![name.to_string()],
            None => self.identity.name_candidates().to_vec(),
        };
        let names = names.as_slice();
        let deployment = ResourceKind::DEPLOYMENT;
        let deployment = &deployment;
        let pod = ResourceKind::POD;
        let pod = &pod;
        wait_until(
            &self.clock,
            format!("waiting for operator in {namespace} to stop"),
            self.poll_interval,
            self.timeout,
            || async move {
                for name in names {
                    if cluster.exists(deployment, namespace, name).await? {
                        return Ok(Observation::pending(format!(
                            "deployment {name} still present"
                        )));
                    }
                    let pods = cluster.list_by_name_prefix(pod, namespace, name).await?;
                    if !pods.is_empty() {
                        return Ok(Observation::pending(format!(
                            "{} pods of {name} remain",
                            pods.len()
                        )));
                    }
                }
                Ok(Observation::Satisfied(()))
            },
        )
        .await
    }
}

/// Deployment has observed its generation and enough replicas are ready
fn deployment_readiness(body: &Value) -> Observation<()> {
    let generation = body.pointer("/metadata/generation").and_then(Value::as_i64);
    let observed = body
        .pointer("/status/observedGeneration")
        .and_then(Value::as_i64);
    let desired = body
        .pointer("/spec/replicas")
        .and_then(Value::as_i64)
        .unwrap_or(1);
    let ready = body
        .pointer("/status/readyReplicas")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if let Some(generation) = generation {
        if observed.is_none_or(|observed| observed < generation) {
            return Observation::pending(format!(
                "observedGeneration {observed:?} behind generation {generation}"
            ));
        }
    }
    Observation::from_bool(
        ready >= desired,
        format!("readyReplicas {ready} of {desired}"),
    )
}

/// Place namespaced objects in the deployment namespace and point a
/// cluster-wide operator at its watched namespaces
fn prepare_manifest(manifest: ObjectManifest, identity: &OperatorIdentity) -> ObjectManifest {
    let mut manifest = if is_cluster_scoped(&manifest.kind) {
        manifest
    } else {
        manifest.in_namespace(&identity.deployment_namespace)
    };

    if !identity.is_namespaced
        && identity.install_method == InstallMethod::ManifestFile
        && manifest.kind == ResourceKind::DEPLOYMENT
    {
        set_watch_namespace(&mut manifest.body, &identity.watch_namespace_value());
    }
    manifest
}

fn set_watch_namespace(body: &mut Value, value: &str) {
    let Some(containers) = body
        .pointer_mut("/spec/template/spec/containers")
        .and_then(Value::as_array_mut)
    else {
        return;
    };
    for container in containers {
        let Some(container) = container.as_object_mut() else {
            continue;
        };
        let env = container
            .entry("env")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(env) = env.as_array_mut() {
            env.retain(|var| var.get("name").and_then(Value::as_str) != Some("WATCH_NAMESPACE"));
            env.push(json!({"name": "WATCH_NAMESPACE", "value": value}));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator_deployment(name: &str) -> ObjectManifest {
        ObjectManifest::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": name},
            "spec": {
                "replicas": 1,
                "template": {"spec": {"containers": [{
                    "name": "manager",
                    "env": [{"name": "WATCH_NAMESPACE", "valueFrom": {"fieldRef": {"fieldPath": "metadata.namespace"}}}]
                }]}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_install_method_from_str() {
        assert_eq!("olm".parse::<InstallMethod>().unwrap(), InstallMethod::PackageManaged);
        assert_eq!("Manifest".parse::<InstallMethod>().unwrap(), InstallMethod::ManifestFile);
        assert!("helm".parse::<InstallMethod>().is_err());
    }

    #[test]
    fn test_manifest_deployment_name_is_tried_first() {
        let config = HarnessConfig::default();
        let manifests = vec![operator_deployment("amq-broker-controller-manager")];
        let identity = OperatorIdentity::from_config("ops", &config, &manifests).unwrap();
        assert_eq!(
            identity.name_candidates(),
            [
                "amq-broker-controller-manager".to_string(),
                "activemq-artemis-controller-manager".to_string(),
                "activemq-artemis-operator".to_string()
            ]
        );
    }

    #[test]
    fn test_package_install_uses_conventional_candidates() {
        let config = HarnessConfig {
            operator_install_method: InstallMethod::PackageManaged,
            ..HarnessConfig::default()
        };
        let identity = OperatorIdentity::from_config("ops", &config, &[]).unwrap();
        assert_eq!(identity.name_candidates(), config.operator_name_candidates());
        assert!(identity.is_namespaced());
        assert_eq!(identity.watched_namespaces(), ["ops".to_string()]);
    }

    #[test]
    fn test_cluster_wide_sets_watch_namespace() {
        let identity = OperatorIdentity::new(
            "ops",
            InstallMethod::ManifestFile,
            vec!["activemq-artemis-controller-manager".to_string()],
            NamePolicy::PreferNewest,
        )
        .unwrap()
        .cluster_wide(vec!["ns-a".to_string(), "ns-b".to_string()]);

        let manifest =
            prepare_manifest(operator_deployment("activemq-artemis-controller-manager"), &identity);
        assert_eq!(manifest.namespace.as_deref(), Some("ops"));
        let env = manifest
            .body
            .pointer("/spec/template/spec/containers/0/env")
            .unwrap();
        assert_eq!(env, &json!([{"name": "WATCH_NAMESPACE", "value": "ns-a,ns-b"}]));
    }

    #[test]
    fn test_cluster_scoped_manifests_keep_no_namespace() {
        let identity = OperatorIdentity::new(
            "ops",
            InstallMethod::ManifestFile,
            vec!["x".to_string()],
            NamePolicy::PreferNewest,
        )
        .unwrap();
        let crd = ObjectManifest::from_value(json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "CustomResourceDefinition",
            "metadata": {"name": "activemqartemises.broker.amq.io"}
        }))
        .unwrap();
        assert_eq!(prepare_manifest(crd, &identity).namespace, None);
    }

    #[test]
    fn test_deployment_readiness() {
        let pending = deployment_readiness(&json!({
            "metadata": {"generation": 2},
            "spec": {"replicas": 1},
            "status": {"observedGeneration": 1, "readyReplicas": 1}
        }));
        assert!(matches!(pending, Observation::Pending(ref t) if t.contains("behind generation 2")));

        let not_ready = deployment_readiness(&json!({
            "metadata": {"generation": 2},
            "spec": {"replicas": 1},
            "status": {"observedGeneration": 2}
        }));
        assert_eq!(not_ready, Observation::pending("readyReplicas 0 of 1"));

        let ready = deployment_readiness(&json!({
            "metadata": {"generation": 2},
            "spec": {"replicas": 1},
            "status": {"observedGeneration": 2, "readyReplicas": 1}
        }));
        assert_eq!(ready, Observation::Satisfied(()));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(OperatorState::NotDeployed.to_string(), "not deployed");
    }
}
