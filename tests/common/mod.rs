//! Common test utilities for lifecycle tests
//!
//! Provides an in-memory cluster whose objects change on a scripted
//! timeline, so waits can be tested with paused tokio time.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use broker_operator_testkit::constants::CONDITION_TYPE_VALID;
use broker_operator_testkit::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const NAMESPACE: &str = "brkconfig-tests";
pub const NEW_OPERATOR_NAME: &str = "activemq-artemis-controller-manager";
pub const OLD_OPERATOR_NAME: &str = "activemq-artemis-operator";

/// Scripted change to the cluster
#[derive(Debug, Clone)]
pub enum Change {
    /// Create or overwrite an object
    Put(ResourceKind, Value),
    Remove {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },
    /// Overwrite the status of an existing object
    SetStatus {
        kind: ResourceKind,
        namespace: String,
        name: String,
        status: Value,
    },
}

type Key = (String, String, String);

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<Key, (ResourceKind, Value)>,
    scheduled: Vec<(Duration, Change)>,
    applied: Vec<String>,
    deleted: Vec<String>,
    lookups: usize,
    deletion_delay: Duration,
    cascade_delay: Option<Duration>,
    fail_lookups: bool,
    resource_version: u64,
}

/// In-memory control plane driven by tokio's clock
#[derive(Debug)]
pub struct FakeCluster {
    origin: Instant,
    state: Mutex<State>,
}

fn key(kind: &ResourceKind, namespace: &str, name: &str) -> Key {
    (kind.kind.to_string(), namespace.to_string(), name.to_string())
}

fn body_key(kind: &ResourceKind, body: &Value) -> Key {
    let namespace = body
        .pointer("/metadata/namespace")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let name = body
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    key(kind, namespace, name)
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Instant::now(),
            state: Mutex::new(State::default()),
        })
    }

    /// Put an object right away
    pub fn seed(&self, kind: ResourceKind, body: Value) {
        let mut state = self.state.lock().unwrap();
        state.objects.insert(body_key(&kind, &body), (kind, body));
    }

    /// Apply `change` once `after` has elapsed since the cluster was created
    pub fn at(&self, after: Duration, change: Change) {
        self.state.lock().unwrap().scheduled.push((after, change));
    }

    /// Keep deleted objects around for `delay` before they disappear
    pub fn set_deletion_delay(&self, delay: Duration) {
        self.state.lock().unwrap().deletion_delay = delay;
    }

    /// Remove pods named after a deleted object once `delay` has passed
    pub fn set_cascade_delay(&self, delay: Duration) {
        self.state.lock().unwrap().cascade_delay = Some(delay);
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.state.lock().unwrap().fail_lookups = fail;
    }

    pub fn applied(&self) -> Vec<String> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    /// Number of get/list calls served so far
    pub fn lookups(&self) -> usize {
        self.state.lock().unwrap().lookups
    }

    pub fn object(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Option<Value> {
        let mut state = self.state.lock().unwrap();
        self.advance(&mut state);
        state
            .objects
            .get(&key(kind, namespace, name))
            .map(|(_, body)| body.clone())
    }

    fn elapsed(&self) -> Duration {
        Instant::now().duration_since(self.origin)
    }

    fn advance(&self, state: &mut State) {
        let now = self.elapsed();
        let mut due: Vec<(Duration, Change)> = Vec::new();
        let mut pending = Vec::new();
        for (at, change) in state.scheduled.drain(..) {
            if at <= now {
                due.push((at, change));
            } else {
                pending.push((at, change));
            }
        }
        state.scheduled = pending;
        due.sort_by_key(|(at, _)| *at);

        for (_, change) in due {
            match change {
                Change::Put(kind, body) => {
                    state.objects.insert(body_key(&kind, &body), (kind, body));
                }
                Change::Remove {
                    kind,
                    namespace,
                    name,
                } => {
                    state.objects.remove(&key(&kind, &namespace, &name));
                }
                Change::SetStatus {
                    kind,
                    namespace,
                    name,
                    status,
                } => {
                    if let Some((_, body)) = state.objects.get_mut(&key(&kind, &namespace, &name)) {
                        body["status"] = status;
                    }
                }
            }
        }
    }

    fn check_lookup(state: &mut State) -> Result<()> {
        state.lookups += 1;
        if state.fail_lookups {
            return Err(HarnessError::Configuration(
                "injected lookup failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Provisioner for FakeCluster {
    async fn apply(&self, manifest: &ObjectManifest) -> Result<ObjectSnapshot> {
        let mut state = self.state.lock().unwrap();
        self.advance(&mut state);

        let namespace = manifest.namespace.clone().unwrap_or_default();
        let object_key = key(&manifest.kind, &namespace, &manifest.name);
        let mut body = manifest.body.clone();

        let generation = match state.objects.get(&object_key) {
            Some((_, existing)) => {
                if let Some(status) = existing.get("status") {
                    body["status"] = status.clone();
                }
                let previous = existing
                    .pointer("/metadata/generation")
                    .and_then(Value::as_i64)
                    .unwrap_or(1);
                if existing.get("spec") == body.get("spec") {
                    previous
                } else {
                    previous + 1
                }
            }
            None => 1,
        };

        state.resource_version += 1;
        body["metadata"]["generation"] = json!(generation);
        body["metadata"]["resourceVersion"] = json!(state.resource_version.to_string());
        state
            .objects
            .insert(object_key, (manifest.kind.clone(), body.clone()));
        state.applied.push(manifest.object_ref().to_string());

        ObjectSnapshot::from_value(manifest.kind.clone(), body)
    }

    async fn delete(&self, target: &ObjectRef) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        self.advance(&mut state);

        let namespace = target.namespace.clone().unwrap_or_default();
        let object_key = key(&target.kind, &namespace, &target.name);
        if !state.objects.contains_key(&object_key) {
            return Err(HarnessError::not_found(
                &target.kind.kind,
                &namespace,
                &target.name,
            ));
        }

        let now = self.elapsed();
        if state.deletion_delay.is_zero() {
            state.objects.remove(&object_key);
        } else {
            let at = now + state.deletion_delay;
            state.scheduled.push((
                at,
                Change::Remove {
                    kind: target.kind.clone(),
                    namespace: namespace.clone(),
                    name: target.name.clone(),
                },
            ));
        }

        if let Some(delay) = state.cascade_delay {
            let dependents: Vec<String> = state
                .objects
                .keys()
                .filter(|(kind, ns, name)| {
                    kind == ResourceKind::POD.kind.as_ref()
                        && ns == &namespace
                        && name.starts_with(&target.name)
                })
                .map(|(_, _, name)| name.clone())
                .collect();
            for name in dependents {
                state.scheduled.push((
                    now + delay,
                    Change::Remove {
                        kind: ResourceKind::POD,
                        namespace: namespace.clone(),
                        name,
                    },
                ));
            }
        }

        state.deleted.push(target.to_string());
        Ok(())
    }
}

#[async_trait]
impl ClusterQuery for FakeCluster {
    async fn get_by_name(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectSnapshot>> {
        let mut state = self.state.lock().unwrap();
        self.advance(&mut state);
        Self::check_lookup(&mut state)?;
        state
            .objects
            .get(&key(kind, namespace, name))
            .map(|(kind, body)| ObjectSnapshot::from_value(kind.clone(), body.clone()))
            .transpose()
    }

    async fn list_by_name_prefix(
        &self,
        kind: &ResourceKind,
        namespace: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSnapshot>> {
        let mut state = self.state.lock().unwrap();
        self.advance(&mut state);
        Self::check_lookup(&mut state)?;
        state
            .objects
            .iter()
            .filter(|((k, ns, name), _)| {
                k == kind.kind.as_ref() && ns == namespace && name.starts_with(prefix)
            })
            .map(|(_, (kind, body))| ObjectSnapshot::from_value(kind.clone(), body.clone()))
            .collect()
    }
}

pub fn config() -> HarnessConfig {
    HarnessConfig::default()
}

pub fn resource_manager(
    cluster: &Arc<FakeCluster>,
) -> ResourceLifecycleManager<Arc<FakeCluster>, Arc<FakeCluster>, TokioClock> {
    ResourceLifecycleManager::new(
        Arc::clone(cluster),
        Arc::clone(cluster),
        TokioClock,
        &config(),
    )
}

pub fn broker_manifest(name: &str, size: i32, storage: Option<&str>) -> ObjectManifest {
    let broker = ActiveMQArtemis::new(
        name,
        ActiveMQArtemisSpec {
            deployment_plan: Some(DeploymentPlan {
                size: Some(size),
                persistence_enabled: storage.map(|_| true),
                storage: storage.map(|size| Storage {
                    size: Some(size.to_string()),
                    ..Storage::default()
                }),
                ..DeploymentPlan::default()
            }),
            ..ActiveMQArtemisSpec::default()
        },
    );
    broker.to_manifest().unwrap()
}

/// Status with `Deployed`, `Valid` and `Ready` as given
pub fn broker_status(deployed: &str, ready: &str, observed_generation: i64) -> Value {
    json!({
        "conditions": [
            {"type": CONDITION_TYPE_VALID, "status": "True", "observedGeneration": observed_generation},
            {"type": "Deployed", "status": deployed, "observedGeneration": observed_generation},
            {"type": "Ready", "status": ready, "observedGeneration": observed_generation}
        ]
    })
}

pub fn set_status(kind: ResourceKind, name: &str, status: Value) -> Change {
    Change::SetStatus {
        kind,
        namespace: NAMESPACE.to_string(),
        name: name.to_string(),
        status,
    }
}

pub fn operator_deployment(name: &str) -> ObjectManifest {
    ObjectManifest::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name},
        "spec": {
            "replicas": 1,
            "template": {"spec": {"containers": [{"name": "manager", "image": "quay.io/artemiscloud/activemq-artemis-operator:latest"}]}}
        }
    }))
    .unwrap()
}

pub fn service_account(name: &str) -> ObjectManifest {
    ObjectManifest::from_value(json!({
        "apiVersion": "v1",
        "kind": "ServiceAccount",
        "metadata": {"name": name}
    }))
    .unwrap()
}

/// Deployment body with its status filled in as the deployment controller would
pub fn ready_deployment(name: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name, "namespace": NAMESPACE, "generation": 1},
        "spec": {"replicas": 1},
        "status": {"observedGeneration": 1, "replicas": 1, "readyReplicas": 1}
    })
}

pub fn deployment_ready_status() -> Value {
    json!({"observedGeneration": 1, "replicas": 1, "readyReplicas": 1})
}

pub fn pod(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": name, "namespace": NAMESPACE},
        "status": {"phase": "Running"}
    })
}

pub fn volume_claim(name: &str, size: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "PersistentVolumeClaim",
        "metadata": {"name": name, "namespace": NAMESPACE},
        "spec": {"resources": {"requests": {"storage": size}}},
        "status": {"phase": "Bound"}
    })
}

/// Suite fixture over the fake cluster
#[derive(Debug)]
pub struct FakeSuite {
    pub namespace: String,
    pub operator: OperatorLifecycleController<Arc<FakeCluster>, Arc<FakeCluster>, TokioClock>,
}

impl SuiteFixture for FakeSuite {
    type Provisioner = Arc<FakeCluster>;
    type Query = Arc<FakeCluster>;
    type Clock = TokioClock;

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn operator(&self) -> &OperatorLifecycleController<Arc<FakeCluster>, Arc<FakeCluster>, TokioClock> {
        &self.operator
    }
}
