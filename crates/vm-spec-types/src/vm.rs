// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::disk::Disk;
use crate::guest::GuestSpec;

/// Resource requests and limits for the pod hosting the VM runner.
///
/// Quantities here are passed through to the scheduler untouched, so they are
/// kept in their original textual form.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields)]
pub struct PodResources {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

/// The desired state of a virtual machine.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct VirtualMachineSpec {
    pub guest: GuestSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<Disk>,

    #[serde(default)]
    pub pod_resources: PodResources,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_acceleration: Option<bool>,

    #[serde(
        default,
        rename = "enableSSH",
        skip_serializing_if = "Option::is_none"
    )]
    pub enable_ssh: Option<bool>,

    /// A script run inside the guest before the workload starts.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub init_script: String,

    /// Port for the hypervisor's QMP control channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qmp: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_grace_period_seconds: Option<u64>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduler_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
}

/// A VirtualMachine object as stored by the API server. Only the spec is
/// modeled; metadata and status are ignored when deserializing.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
pub struct VirtualMachine {
    pub spec: VirtualMachineSpec,
}

impl From<VirtualMachineSpec> for VirtualMachine {
    fn from(spec: VirtualMachineSpec) -> Self {
        Self { spec }
    }
}
