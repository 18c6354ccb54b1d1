//! # Resource Lifecycle
//!
//! Create, update, delete and readiness polling of managed custom resources.
//!
//! Every read goes back to the control plane: a [`ManagedResource`] is the
//! caller's snapshot of one moment and is never refreshed behind its back.
//!
//! ## Readiness
//!
//! A resource is ready when its authoritative `Deployed` and `Ready`
//! conditions are both `True`. A condition that carries `observedGeneration`
//! only counts once it has caught up with the object's current generation,
//! so an update is not reported ready on the strength of the previous spec.
//!
//! ## Volume claims
//!
//! Storage-size changes are not propagated to claims that already exist;
//! the operator leaves them alone to avoid data loss and so does this
//! manager. [`UpdateOutcome::retained_claims`] lists the claims whose size
//! now differs from the spec.

use crate::clock::{Clock, TokioClock};
use crate::cluster::{ClusterQuery, ObjectManifest, ObjectRef, ObjectSnapshot, Provisioner, ResourceKind};
use crate::config::HarnessConfig;
use crate::constants::{CONDITION_TYPE_DEPLOYED, CONDITION_TYPE_READY, STATEFULSET_SUFFIX};
use crate::error::{HarnessError, Result};
use crate::status::{self, ConditionMatch, ConditionQuery, StatusCondition};
use crate::wait::{wait_until, Observation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Caller-owned snapshot of one managed resource
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedResource {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    /// Desired state; edited by the caller before [`ResourceLifecycleManager::update`]
    pub spec: Value,
    /// Conditions as observed when the snapshot was taken
    pub conditions: Vec<StatusCondition>,
    pub generation: Option<i64>,
    body: Value,
}

impl ManagedResource {
    pub fn from_snapshot(snapshot: ObjectSnapshot) -> Result<Self> {
        let namespace = snapshot.namespace.clone().ok_or_else(|| {
            HarnessError::InvalidManifest(format!(
                "{} {} is not namespaced",
                snapshot.kind, snapshot.name
            ))
        })?;
        let conditions = snapshot.status_conditions()?;
        let spec = snapshot.spec().cloned().unwrap_or(Value::Null);
        Ok(Self {
            kind: snapshot.kind,
            namespace,
            name: snapshot.name,
            spec,
            conditions,
            generation: snapshot.generation,
            body: snapshot.body,
        })
    }

    /// Typed view of the spec, e.g. `spec_as::<ActiveMQArtemisSpec>()`
    pub fn spec_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.spec.clone())?)
    }

    /// Replace the spec from a typed value
    pub fn set_spec<T: Serialize>(&mut self, spec: &T) -> Result<()> {
        self.spec = serde_json::to_value(spec)?;
        Ok(())
    }

    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            kind: self.kind.clone(),
            namespace: Some(self.namespace.clone()),
            name: self.name.clone(),
        }
    }

    /// Full desired object: last observed body with the current spec, minus
    /// status and server-populated metadata
    #[must_use]
    pub fn to_manifest(&self) -> ObjectManifest {
        let mut body = self.body.clone();
        if let Some(object) = body.as_object_mut() {
            object.remove("status");
            object.insert("spec".to_string(), self.spec.clone());
            if let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) {
                for field in [
                    "resourceVersion",
                    "uid",
                    "generation",
                    "creationTimestamp",
                    "managedFields",
                ] {
                    metadata.remove(field);
                }
            }
        }
        ObjectManifest {
            kind: self.kind.clone(),
            namespace: Some(self.namespace.clone()),
            name: self.name.clone(),
            body,
        }
    }
}

/// Options of [`ResourceLifecycleManager::create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    pub wait_ready: bool,
    /// Readiness deadline; the configured default when `None`
    pub timeout: Option<Duration>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            wait_ready: true,
            timeout: None,
        }
    }
}

impl CreateOptions {
    /// Return right after the control plane accepted the object
    #[must_use]
    pub fn no_wait() -> Self {
        Self {
            wait_ready: false,
            timeout: None,
        }
    }

    /// Shorter deadline for negative tests that expect the resource never
    /// to become ready
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Options of [`ResourceLifecycleManager::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    pub wait_ready: bool,
    pub timeout: Option<Duration>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            wait_ready: true,
            timeout: None,
        }
    }
}

impl UpdateOptions {
    #[must_use]
    pub fn no_wait() -> Self {
        Self {
            wait_ready: false,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Result of [`ResourceLifecycleManager::update`]
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub resource: ManagedResource,
    /// Existing volume claims whose requested size differs from the new spec
    pub retained_claims: Vec<String>,
}

/// Claim name of a broker replica: `<name>-<name>-ss-<ordinal>`
#[must_use]
pub fn volume_claim_name(broker_name: &str, ordinal: u32) -> String {
    format!("{broker_name}-{broker_name}{STATEFULSET_SUFFIX}-{ordinal}")
}

/// Lifecycle and readiness polling of managed resources
#[derive(Debug)]
pub struct ResourceLifecycleManager<P, Q, C = TokioClock> {
    provisioner: P,
    query: Q,
    clock: C,
    poll_interval: Duration,
    ready_timeout: Duration,
    update_timeout: Duration,
}

impl<P, Q, C> ResourceLifecycleManager<P, Q, C>
where
    P: Provisioner,
    Q: ClusterQuery,
    C: Clock,
{
    pub fn new(provisioner: P, query: Q, clock: C, config: &HarnessConfig) -> Self {
        Self {
            provisioner,
            query,
            clock,
            poll_interval: config.poll_interval(),
            ready_timeout: config.resource_ready_timeout(),
            update_timeout: config.resource_update_timeout(),
        }
    }

    /// Create the object in `namespace`, optionally blocking until ready
    pub async fn create(
        &self,
        namespace: &str,
        manifest: ObjectManifest,
        options: CreateOptions,
    ) -> Result<ManagedResource> {
        let manifest = manifest.in_namespace(namespace);
        let created = self.provisioner.apply(&manifest).await?;
        info!("Created {}", manifest.object_ref());

        let snapshot = if options.wait_ready {
            self.wait_ready(&created, options.timeout.unwrap_or(self.ready_timeout))
                .await?
        } else {
            created
        };
        ManagedResource::from_snapshot(snapshot)
    }

    /// Replace the whole object with the resource's current spec
    pub async fn update(
        &self,
        resource: &ManagedResource,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome> {
        let manifest = resource.to_manifest();
        let updated = self.provisioner.apply(&manifest).await?;
        info!(
            "Updated {} (generation {:?})",
            manifest.object_ref(),
            updated.generation
        );

        let snapshot = if options.wait_ready {
            self.wait_ready(&updated, options.timeout.unwrap_or(self.update_timeout))
                .await?
        } else {
            updated
        };

        let retained_claims = self.retained_claims(&snapshot).await?;
        for claim in &retained_claims {
            warn!(
                "Volume claim {} keeps its previous size; storage changes do not apply to existing claims",
                claim
            );
        }

        Ok(UpdateOutcome {
            resource: ManagedResource::from_snapshot(snapshot)?,
            retained_claims,
        })
    }

    /// Request deletion; does not wait for the object to disappear
    pub async fn delete(&self, resource: &ManagedResource) -> Result<()> {
        let target = resource.object_ref();
        self.provisioner.delete(&target).await?;
        info!("Requested deletion of {}", target);
        Ok(())
    }

    /// Fresh snapshot of the resource
    pub async fn get(&self, resource: &ManagedResource) -> Result<ManagedResource> {
        match self
            .query
            .get_by_name(&resource.kind, &resource.namespace, &resource.name)
            .await?
        {
            Some(snapshot) => ManagedResource::from_snapshot(snapshot),
            None => Err(HarnessError::not_found(
                &resource.kind.kind,
                &resource.namespace,
                &resource.name,
            )),
        }
    }

    /// Poll until `query` holds; `false` when the deadline passed without a match
    ///
    /// Lookup failures and invalid deadlines are errors, not `false`.
    pub async fn wait_for_status_condition(
        &self,
        resource: &ManagedResource,
        query: &ConditionQuery,
        timeout: Duration,
    ) -> Result<bool> {
        match self.require_status_condition(resource, query, timeout).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_timeout() => {
                warn!("{}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Poll until `query` holds and return the matching condition
    pub async fn require_status_condition(
        &self,
        resource: &ManagedResource,
        query: &ConditionQuery,
        timeout: Duration,
    ) -> Result<StatusCondition> {
        let cluster = &self.query;
        let (kind, namespace, name) = (&resource.kind, &resource.namespace, &resource.name);
        wait_until(
            &self.clock,
            format!("waiting for {kind} {namespace}/{name} to report {query}"),
            self.poll_interval,
            timeout,
            || async move {
                let Some(conditions) = cluster.status_conditions(kind, namespace, name).await?
                else {
                    return Ok(Observation::pending("object not found"));
                };
                Ok(match status::evaluate(&conditions, query) {
                    ConditionMatch::Matched(condition) => Observation::Satisfied(condition.clone()),
                    ConditionMatch::Mismatch(condition) => Observation::pending(condition),
                    ConditionMatch::Absent => Observation::pending(format!(
                        "no {} condition ({})",
                        query.condition_type,
                        status::summarize(&conditions)
                    )),
                })
            },
        )
        .await
    }

    /// Poll until the object is no longer returned by the query interface
    pub async fn wait_for_removal(&self, resource: &ManagedResource, timeout: Duration) -> Result<()> {
        let cluster = &self.query;
        let (kind, namespace, name) = (&resource.kind, &resource.namespace, &resource.name);
        wait_until(
            &self.clock,
            format!("waiting for {kind} {namespace}/{name} to be removed"),
            self.poll_interval,
            timeout,
            || async move {
                let exists = cluster.exists(kind, namespace, name).await?;
                Ok(Observation::from_bool(!exists, "still present"))
            },
        )
        .await?;
        info!("{} {}/{} removed", kind, namespace, name);
        Ok(())
    }

    /// Dependent objects (pods, routes, claims) by name prefix
    pub async fn list_by_prefix(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSnapshot>> {
        self.query.list_by_name_prefix(kind, namespace, prefix).await
    }

    async fn wait_ready(&self, applied: &ObjectSnapshot, timeout: Duration) -> Result<ObjectSnapshot> {
        let cluster = &self.query;
        let kind = &applied.kind;
        let name = &applied.name;
        let namespace = applied.namespace.as_deref().unwrap_or_default();
        wait_until(
            &self.clock,
            format!("waiting for {kind} {namespace}/{name} to be ready"),
            self.poll_interval,
            timeout,
            || async move {
                match cluster.get_by_name(kind, namespace, name).await? {
                    Some(snapshot) => readiness(snapshot),
                    None => Ok(Observation::pending("object not found")),
                }
            },
        )
        .await
    }

    async fn retained_claims(&self, snapshot: &ObjectSnapshot) -> Result<Vec<String>> {
        if snapshot.kind != ResourceKind::BROKER {
            return Ok(Vec::new());
        }
        let Some(desired) = snapshot
            .body
            .pointer("/spec/deploymentPlan/storage/size")
            .and_then(Value::as_str)
        else {
            return Ok(Vec::new());
        };
        let namespace = snapshot.namespace.as_deref().unwrap_or_default();
        let prefix = format!("{0}-{0}{1}-", snapshot.name, STATEFULSET_SUFFIX);
        let claims = self
            .query
            .list_by_name_prefix(&ResourceKind::PERSISTENT_VOLUME_CLAIM, namespace, &prefix)
            .await?;

        Ok(claims
            .into_iter()
            .filter(|claim| {
                claim
                    .body
                    .pointer("/spec/resources/requests/storage")
                    .and_then(Value::as_str)
                    .is_some_and(|size| !same_quantity(size, desired))
            })
            .map(|claim| claim.name)
            .collect())
    }
}

/// `Deployed=True` and `Ready=True`, both current for the object's generation
fn readiness(snapshot: ObjectSnapshot) -> Result<Observation<ObjectSnapshot>> {
    let status_generation = snapshot
        .body
        .pointer("/status/observedGeneration")
        .and_then(Value::as_i64);
    if let (Some(observed), Some(current)) = (status_generation, snapshot.generation) {
        if observed < current {
            return Ok(Observation::pending(format!(
                "status observed generation {observed}, current {current}"
            )));
        }
    }
    let conditions = snapshot.status_conditions()?;
    for condition_type in [CONDITION_TYPE_DEPLOYED, CONDITION_TYPE_READY] {
        match status::evaluate(&conditions, &ConditionQuery::is_true(condition_type)) {
            ConditionMatch::Matched(condition) => {
                if let (Some(observed), Some(current)) =
                    (condition.observed_generation, snapshot.generation)
                {
                    if observed < current {
                        return Ok(Observation::pending(format!(
                            "{condition} observed generation {observed}, current {current}"
                        )));
                    }
                }
            }
            ConditionMatch::Mismatch(_) | ConditionMatch::Absent => {
                return Ok(Observation::pending(status::summarize(&conditions)));
            }
        }
    }
    debug!("{} {} is ready", snapshot.kind, snapshot.name);
    Ok(Observation::Satisfied(snapshot))
}

/// Compare two Kubernetes quantities; falls back to text equality when either
/// does not parse
fn same_quantity(a: &str, b: &str) -> bool {
    match (quantity_value(a), quantity_value(b)) {
        (Some(x), Some(y)) => (x - y).abs() <= f64::EPSILON * x.abs().max(y.abs()),
        _ => a == b,
    }
}

fn quantity_value(quantity: &str) -> Option<f64> {
    const SUFFIXES: [(&str, f64); 12] = [
        ("Ki", 1024.0),
        ("Mi", 1_048_576.0),
        ("Gi", 1_073_741_824.0),
        ("Ti", 1_099_511_627_776.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ei", 1_152_921_504_606_846_976.0),
        ("k", 1e3),
        ("M", 1e6),
        ("G", 1e9),
        ("T", 1e12),
        ("P", 1e15),
        ("E", 1e18),
    ];
    let quantity = quantity.trim();
    for (suffix, factor) in SUFFIXES {
        if let Some(number) = quantity.strip_suffix(suffix) {
            return number.parse::<f64>().ok().map(|n| n * factor);
        }
    }
    quantity.parse::<f64>().ok()
}
