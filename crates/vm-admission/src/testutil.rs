// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spec fixtures shared by this crate's unit tests.

use vm_spec_types::disk::{DiskSource, EmptyDiskSource};
use vm_spec_types::{
    ByteQuantity, CpuRange, Disk, EnvVar, GuestSettings, GuestSpec,
    MemorySlots, MilliCpu, PodResources, Port, Protocol, RootDisk,
    VirtualMachineSpec,
};

/// A spec that passes every admission check.
pub(crate) fn test_spec() -> VirtualMachineSpec {
    VirtualMachineSpec {
        guest: GuestSpec {
            cpus: CpuRange {
                min: MilliCpu::from_cpus(1),
                max: MilliCpu::from_cpus(4),
                use_: MilliCpu::from_cpus(2),
            },
            memory_slot_size: ByteQuantity::from_gib(1),
            memory_slots: MemorySlots { min: 1, max: 8, use_: 2 },
            root_disk: RootDisk {
                image: "vm-compute-node:v16".to_string(),
                ..Default::default()
            },
            command: vec!["/usr/bin/compute_ctl".to_string()],
            env: vec![EnvVar {
                name: "PGDATA".to_string(),
                value: "/var/db/postgres".to_string(),
            }],
            ports: vec![port("postgres")],
            settings: Some(GuestSettings {
                sysctl: vec!["vm.swappiness=10".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        },
        disks: vec![disk("pgdata")],
        pod_resources: PodResources::default(),
        enable_ssh: Some(true),
        ..Default::default()
    }
}

pub(crate) fn disk(name: &str) -> Disk {
    Disk {
        name: name.to_string(),
        mount_path: format!("/var/{}", name),
        read_only: None,
        source: DiskSource::EmptyDisk(EmptyDiskSource {
            size: ByteQuantity::from_gib(16),
            discard: false,
        }),
    }
}

pub(crate) fn port(name: &str) -> Port {
    Port { name: name.to_string(), port: 5432, protocol: Protocol::Tcp }
}
