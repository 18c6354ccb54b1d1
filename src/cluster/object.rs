//! # Object Model
//!
//! Kind-erased objects exchanged with the control plane. Bodies are kept as
//! `serde_json::Value` so one code path serves built-in kinds, the broker
//! custom resources and whatever else an operator manifest contains.

use crate::error::{HarnessError, Result};
use crate::status::StatusCondition;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Group, version, kind and plural of an API type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    pub group: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub kind: Cow<'static, str>,
    pub plural: Cow<'static, str>,
}

impl ResourceKind {
    pub const DEPLOYMENT: Self = Self::builtin("apps", "v1", "Deployment", "deployments");
    pub const POD: Self = Self::builtin("", "v1", "Pod", "pods");
    pub const STATEFUL_SET: Self = Self::builtin("apps", "v1", "StatefulSet", "statefulsets");
    pub const PERSISTENT_VOLUME_CLAIM: Self = Self::builtin(
        "",
        "v1",
        "PersistentVolumeClaim",
        "persistentvolumeclaims",
    );
    pub const BROKER: Self = Self::builtin(
        "broker.amq.io",
        "v1beta1",
        "ActiveMQArtemis",
        "activemqartemises",
    );
    pub const BROKER_ADDRESS: Self = Self::builtin(
        "broker.amq.io",
        "v1beta1",
        "ActiveMQArtemisAddress",
        "activemqartemisaddresses",
    );

    const fn builtin(
        group: &'static str,
        version: &'static str,
        kind: &'static str,
        plural: &'static str,
    ) -> Self {
        Self {
            group: Cow::Borrowed(group),
            version: Cow::Borrowed(version),
            kind: Cow::Borrowed(kind),
            plural: Cow::Borrowed(plural),
        }
    }

    /// Kind from an `apiVersion` / `kind` pair, with a guessed plural
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        Self {
            group: Cow::Owned(group.to_string()),
            version: Cow::Owned(version.to_string()),
            kind: Cow::Owned(kind.to_string()),
            plural: Cow::Owned(guess_plural(kind)),
        }
    }

    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}

fn guess_plural(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh")
    {
        format!("{lower}es")
    } else if let Some(stem) = lower.strip_suffix('y') {
        if stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            format!("{lower}s")
        } else {
            format!("{stem}ies")
        }
    } else {
        format!("{lower}s")
    }
}

/// Address of one object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub kind: ResourceKind,
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{} {}/{}", self.kind, namespace, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Desired state of one object, as submitted to [`crate::cluster::Provisioner::apply`]
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectManifest {
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
    pub body: Value,
}

impl ObjectManifest {
    /// Parse the addressing fields out of a full object body
    pub fn from_value(body: Value) -> Result<Self> {
        let api_version = str_field(&body, "/apiVersion")?;
        let kind = str_field(&body, "/kind")?;
        let name = str_field(&body, "/metadata/name")?;
        let namespace = body
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        Ok(Self {
            kind: ResourceKind::from_api_version(api_version, kind),
            namespace,
            name: name.to_string(),
            body,
        })
    }

    /// Manifest of a typed resource (k8s-openapi type or custom resource)
    pub fn from_resource<K: Serialize>(resource: &K) -> Result<Self> {
        Self::from_value(serde_json::to_value(resource)?)
    }

    /// Use a known kind instead of the guessed one (custom plurals)
    #[must_use]
    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Place the object in `namespace`, body included
    #[must_use]
    pub fn in_namespace(mut self, namespace: &str) -> Self {
        if let Some(metadata) = self.body.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert(
                "namespace".to_string(),
                Value::String(namespace.to_string()),
            );
        }
        self.namespace = Some(namespace.to_string());
        self
    }

    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    #[must_use]
    pub fn spec(&self) -> Option<&Value> {
        self.body.get("spec")
    }
}

/// Observed state of one object, as returned by the query interface
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSnapshot {
    pub kind: ResourceKind,
    pub namespace: Option<String>,
    pub name: String,
    pub generation: Option<i64>,
    pub body: Value,
}

impl ObjectSnapshot {
    pub fn from_value(kind: ResourceKind, body: Value) -> Result<Self> {
        let name = str_field(&body, "/metadata/name")?.to_string();
        let namespace = body
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        let generation = body.pointer("/metadata/generation").and_then(Value::as_i64);
        Ok(Self {
            kind,
            namespace,
            name,
            generation,
            body,
        })
    }

    /// Conditions under `status.conditions`; empty when the status is not yet written
    pub fn status_conditions(&self) -> Result<Vec<StatusCondition>> {
        match self.body.pointer("/status/conditions") {
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(conditions) => Ok(serde_json::from_value(conditions.clone())?),
        }
    }

    #[must_use]
    pub fn spec(&self) -> Option<&Value> {
        self.body.get("spec")
    }

    #[must_use]
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

fn str_field<'a>(body: &'a Value, pointer: &str) -> Result<&'a str> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| HarnessError::InvalidManifest(format!("missing {pointer}")))
}
