//! # ActiveMQArtemis
//!
//! Typed view of the broker custom resource, covering the fields the suites
//! set. Unset optional fields are omitted from the serialized body so the
//! operator applies its own defaults.

use crate::cluster::{ObjectManifest, ResourceKind};
use crate::constants::STATEFULSET_SUFFIX;
use crate::error::Result;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "broker.amq.io",
    version = "v1beta1",
    kind = "ActiveMQArtemis",
    plural = "activemqartemises",
    namespaced,
    status = "ActiveMQArtemisStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMQArtemisSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_plan: Option<DeploymentPlan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptors: Vec<Acceptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<Console>,
    /// Extra container environment, e.g. `JAVA_ARGS_APPEND`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub broker_properties: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    /// Number of broker replicas (statefulset ordinals)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<Storage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_login: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_migration: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Storage {
    /// Requested claim size, as a Kubernetes quantity ("1Gi", "3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,
}

/// Container resources; quantities stay as strings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Acceptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocols: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_client_auth: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Console {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct EnvVar {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Status written by the operator
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMQArtemisStatus {
    #[serde(default)]
    #[schemars(with = "Vec<serde_json::Value>")]
    pub conditions: Vec<crate::status::StatusCondition>,
}

impl ActiveMQArtemis {
    /// Replica count, 1 when not set
    #[must_use]
    pub fn replicas(&self) -> i32 {
        self.spec
            .deployment_plan
            .as_ref()
            .and_then(|plan| plan.size)
            .unwrap_or(1)
    }

    #[must_use]
    pub fn storage_size(&self) -> Option<&str> {
        self.spec
            .deployment_plan
            .as_ref()
            .and_then(|plan| plan.storage.as_ref())
            .and_then(|storage| storage.size.as_deref())
    }

    /// Name of the statefulset pod with the given ordinal
    #[must_use]
    pub fn pod_name(&self, ordinal: u32) -> String {
        format!("{}{}-{}", self.name_any(), STATEFULSET_SUFFIX, ordinal)
    }

    pub fn to_manifest(&self) -> Result<ObjectManifest> {
        Ok(ObjectManifest::from_resource(self)?.with_kind(ResourceKind::BROKER))
    }
}
