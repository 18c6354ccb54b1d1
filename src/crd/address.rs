//! # ActiveMQArtemisAddress
//!
//! Address and queue declared on the brokers of a namespace.

use crate::cluster::{ObjectManifest, ResourceKind};
use crate::error::Result;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "broker.amq.io",
    version = "v1beta1",
    kind = "ActiveMQArtemisAddress",
    plural = "activemqartemisaddresses",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMQArtemisAddressSpec {
    pub address_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_name: Option<String>,
    /// `anycast` or `multicast`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove_from_broker_on_delete: Option<bool>,
}

impl ActiveMQArtemisAddress {
    pub fn to_manifest(&self) -> Result<ObjectManifest> {
        Ok(ObjectManifest::from_resource(self)?.with_kind(ResourceKind::BROKER_ADDRESS))
    }
}
