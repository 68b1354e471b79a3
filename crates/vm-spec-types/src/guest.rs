// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The guest half of a VM spec: processors, memory, the root disk, and the
//! workload that runs inside the guest.

use std::fmt::Display;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quantity::{ByteQuantity, MilliCpu};
use crate::settings::GuestSettings;

/// virtio-mem hotplugs memory in blocks of this size, so slots handed to it
/// must be a whole number of blocks.
pub const VIRTIO_MEM_BLOCK_SIZE: ByteQuantity = ByteQuantity::from_mib(8);

/// The guest's vCPU allotment.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    JsonSchema,
)]
#[serde(deny_unknown_fields)]
pub struct CpuRange {
    /// The fewest CPUs the guest may be scaled down to.
    pub min: MilliCpu,

    /// The most CPUs the guest may be scaled up to.
    pub max: MilliCpu,

    /// The CPUs currently assigned to the guest.
    #[serde(rename = "use")]
    pub use_: MilliCpu,
}

/// The guest's memory allotment, counted in slots of
/// [`GuestSpec::memory_slot_size`] bytes each.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    JsonSchema,
)]
#[serde(deny_unknown_fields)]
pub struct MemorySlots {
    pub min: u32,
    pub max: u32,
    #[serde(rename = "use")]
    pub use_: u32,
}

/// The mechanism used to hot-add memory to a running guest.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema,
)]
pub enum MemoryProvider {
    #[serde(rename = "DIMMSlots")]
    DimmSlots,
    VirtioMem,
}

impl Display for MemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DimmSlots => "DIMMSlots",
            Self::VirtioMem => "VirtioMem",
        };

        f.write_str(name)
    }
}

/// Reasons a guest's memory layout can't be served by a memory provider.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MemoryProviderError {
    #[error(
        "memorySlotSize invalid for memoryProvider {provider}: must be a \
         multiple of {alignment}"
    )]
    SlotSizeMisaligned { provider: MemoryProvider, alignment: ByteQuantity },
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

/// A port the guest workload listens on.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Port {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum PullPolicy {
    Always,
    Never,
    IfNotPresent,
}

/// The image the guest boots from.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RootDisk {
    pub image: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ByteQuantity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<PullPolicy>,

    /// Files inside the image that should be made executable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execute: Vec<String>,
}

#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields)]
pub struct EnvVar {
    pub name: String,

    #[serde(default)]
    pub value: String,
}

/// Everything about the guest operating system and its workload.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GuestSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_kernel_cmdline: Option<String>,

    pub cpus: CpuRange,

    pub memory_slot_size: ByteQuantity,

    pub memory_slots: MemorySlots,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_provider: Option<MemoryProvider>,

    pub root_disk: RootDisk,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GuestSettings>,
}

impl GuestSpec {
    /// Checks that this guest's memory slots can be hot-added by `provider`.
    pub fn validate_for_memory_provider(
        &self,
        provider: MemoryProvider,
    ) -> Result<(), MemoryProviderError> {
        match provider {
            MemoryProvider::DimmSlots => Ok(()),
            MemoryProvider::VirtioMem => {
                if self.memory_slot_size.bytes() % VIRTIO_MEM_BLOCK_SIZE.bytes()
                    != 0
                {
                    return Err(MemoryProviderError::SlotSizeMisaligned {
                        provider,
                        alignment: VIRTIO_MEM_BLOCK_SIZE,
                    });
                }

                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn guest_with_slot_size(size: ByteQuantity) -> GuestSpec {
        GuestSpec { memory_slot_size: size, ..Default::default() }
    }

    #[test]
    fn dimm_slots_accept_any_slot_size() {
        let guest = guest_with_slot_size(ByteQuantity::from_bytes(12345));
        assert!(guest
            .validate_for_memory_provider(MemoryProvider::DimmSlots)
            .is_ok());
    }

    #[test]
    fn virtio_mem_requires_block_aligned_slots() {
        for (size, ok) in [
            (ByteQuantity::from_gib(1), true),
            (ByteQuantity::from_mib(8), true),
            (ByteQuantity::from_mib(24), true),
            (ByteQuantity::from_mib(4), false),
            (ByteQuantity::from_bytes(1_000_000_000), false),
        ] {
            let result = guest_with_slot_size(size)
                .validate_for_memory_provider(MemoryProvider::VirtioMem);
            assert_eq!(result.is_ok(), ok, "slot size {}", size);
        }
    }

    #[test]
    fn misaligned_slot_message_names_the_alignment() {
        let err = guest_with_slot_size(ByteQuantity::from_mib(1))
            .validate_for_memory_provider(MemoryProvider::VirtioMem)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "memorySlotSize invalid for memoryProvider VirtioMem: must be a \
             multiple of 8Mi"
        );
    }

    #[test]
    fn guest_spec_wire_names() {
        let guest: GuestSpec = serde_json::from_value(serde_json::json!({
            "cpus": { "min": 0.25, "max": 4, "use": "1" },
            "memorySlotSize": "1Gi",
            "memorySlots": { "min": 1, "max": 8, "use": 2 },
            "memoryProvider": "DIMMSlots",
            "rootDisk": {
                "image": "vm-postgres:15",
                "imagePullPolicy": "IfNotPresent"
            },
            "ports": [ { "name": "postgres", "port": 5432 } ],
        }))
        .unwrap();

        assert_eq!(guest.cpus.min, MilliCpu::from_millis(250));
        assert_eq!(guest.cpus.use_, MilliCpu::from_cpus(1));
        assert_eq!(guest.memory_slots.max, 8);
        assert_eq!(guest.memory_provider, Some(MemoryProvider::DimmSlots));
        assert_eq!(guest.ports[0].protocol, Protocol::Tcp);
        assert!(guest.settings.is_none());
        assert!(guest.env.is_empty());
    }
}
