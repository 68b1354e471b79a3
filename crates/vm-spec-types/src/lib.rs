// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Types describing a virtual machine's desired configuration.
//!
//! This crate owns the shape of a VM spec and the checks that belong to the
//! spec's own fields (whether a memory provider can serve the configured slot
//! size, and how the two swap fields resolve to one swap configuration).
//! Policy about which specs may be admitted, or how one spec may change into
//! another, lives in `vm_admission`.

use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod disk;
pub mod guest;
pub mod quantity;
pub mod settings;
pub mod vm;

pub use disk::{Disk, DiskSource, DiskSourceError};
pub use guest::{
    CpuRange, EnvVar, GuestSpec, MemoryProvider, MemoryProviderError,
    MemorySlots, Port, Protocol, RootDisk,
};
pub use quantity::{ByteQuantity, MilliCpu, QuantityError};
pub use settings::{GuestSettings, SwapInfo, SwapInfoError};
pub use vm::{PodResources, VirtualMachine, VirtualMachineSpec};

/// The encodings a spec document may be written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// Picks a format from a file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Errors which may be returned when reading a spec document.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Cannot parse json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot parse toml: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Don't know how to parse {0}; expected a .json or .toml file")]
    UnknownFormat(PathBuf),
}

/// Reads a spec from a file. The file may hold either a whole VirtualMachine
/// object (with the spec under a `spec` key) or a bare spec.
pub fn parse<P: AsRef<Path>>(
    path: P,
) -> Result<VirtualMachineSpec, ParseError> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| ParseError::UnknownFormat(path.to_path_buf()))?;
    let contents = std::fs::read_to_string(path)?;
    parse_str(&contents, format)
}

/// Parses a spec from a string; see [`parse`].
pub fn parse_str(
    contents: &str,
    format: DocumentFormat,
) -> Result<VirtualMachineSpec, ParseError> {
    match format {
        DocumentFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(contents)?;
            if value.get("spec").is_some() {
                Ok(serde_json::from_value::<VirtualMachine>(value)?.spec)
            } else {
                Ok(serde_json::from_value(value)?)
            }
        }
        DocumentFormat::Toml => {
            let value: toml::Value = toml::from_str(contents)?;
            if value.get("spec").is_some() {
                Ok(value.try_into::<VirtualMachine>()?.spec)
            } else {
                Ok(value.try_into()?)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const VM_JSON: &str = r#"{
        "apiVersion": "vm.neon.tech/v1",
        "kind": "VirtualMachine",
        "metadata": { "name": "compute-quiet-river" },
        "spec": {
            "guest": {
                "cpus": { "min": 0.25, "max": 4, "use": 1 },
                "memorySlotSize": "1Gi",
                "memorySlots": { "min": 1, "max": 8, "use": 2 },
                "memoryProvider": "VirtioMem",
                "rootDisk": { "image": "neondatabase/vm-compute-node:v16" },
                "command": [ "/usr/local/bin/compute_ctl" ],
                "env": [ { "name": "PGDATA", "value": "/var/db/postgres" } ],
                "ports": [ { "name": "postgres", "port": 5432 } ],
                "settings": {
                    "sysctl": [ "vm.swappiness=10" ],
                    "swapInfo": { "size": "2Gi", "skipSwapon": false }
                }
            },
            "disks": [
                {
                    "name": "pgdata",
                    "mountPath": "/var/db",
                    "emptyDisk": { "size": "16Gi" }
                }
            ],
            "podResources": { "requests": { "cpu": "250m" } },
            "enableSSH": true,
            "restartPolicy": "Never"
        },
        "status": { "phase": "Running" }
    }"#;

    #[test]
    fn parse_vm_object() {
        let spec = parse_str(VM_JSON, DocumentFormat::Json).unwrap();
        assert_eq!(spec.guest.cpus.max, MilliCpu::from_cpus(4));
        assert_eq!(spec.guest.memory_provider, Some(MemoryProvider::VirtioMem));
        assert_eq!(spec.disks[0].name, "pgdata");
        assert_eq!(spec.enable_ssh, Some(true));
        assert_eq!(spec.enable_acceleration, None);
        assert_eq!(spec.pod_resources.requests["cpu"], "250m");

        let settings = spec.guest.settings.as_ref().unwrap();
        assert_eq!(
            settings.swap_info.as_ref().map(|s| s.size),
            Some(ByteQuantity::from_gib(2))
        );
    }

    #[test]
    fn parse_bare_spec_toml() {
        let toml = r#"
            initScript = "echo hello"

            [guest]
            memorySlotSize = "512Mi"
            cpus = { min = 1, max = 2, use = 1 }
            memorySlots = { min = 1, max = 4, use = 1 }
            rootDisk = { image = "alpine:3.19" }

            [guest.settings]
            swap = "1Gi"

            [[disks]]
            name = "scratch"
            mountPath = "/scratch"
            tmpfs = { size = "256Mi" }
        "#;

        let spec = parse_str(toml, DocumentFormat::Toml).unwrap();
        assert_eq!(spec.init_script, "echo hello");
        assert_eq!(spec.guest.memory_slot_size, ByteQuantity::from_mib(512));
        assert_eq!(
            spec.guest.settings.unwrap().swap,
            Some(ByteQuantity::from_gib(1))
        );
        assert!(matches!(spec.disks[0].source, DiskSource::Tmpfs(_)));
    }

    #[test]
    fn absent_and_empty_lists_parse_the_same() {
        let absent = r#"{ "guest": {
            "cpus": { "min": 1, "max": 1, "use": 1 },
            "memorySlotSize": "1Gi",
            "memorySlots": { "min": 1, "max": 1, "use": 1 },
            "rootDisk": { "image": "img" } } }"#;
        let empty = r#"{ "disks": [], "guest": {
            "cpus": { "min": 1, "max": 1, "use": 1 },
            "memorySlotSize": "1Gi",
            "memorySlots": { "min": 1, "max": 1, "use": 1 },
            "rootDisk": { "image": "img" },
            "ports": [], "env": [], "args": [] } }"#;

        assert_eq!(
            parse_str(absent, DocumentFormat::Json).unwrap(),
            parse_str(empty, DocumentFormat::Json).unwrap()
        );
    }

    #[test]
    fn unknown_spec_fields_are_rejected() {
        let doc = r#"{ "spec": { "bogus": 1, "guest": {
            "cpus": { "min": 1, "max": 1, "use": 1 },
            "memorySlotSize": "1Gi",
            "memorySlots": { "min": 1, "max": 1, "use": 1 },
            "rootDisk": { "image": "img" } } } }"#;
        let err = parse_str(doc, DocumentFormat::Json).unwrap_err();
        assert!(err.to_string().contains("bogus"), "unexpected error: {}", err);
    }

    #[test]
    fn spec_survives_json_round_trip() {
        let spec = parse_str(VM_JSON, DocumentFormat::Json).unwrap();
        let json = serde_json::to_string(&VirtualMachine::from(spec.clone()))
            .unwrap();
        assert_eq!(parse_str(&json, DocumentFormat::Json).unwrap(), spec);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("vm.json")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("dir/vm.toml")),
            Some(DocumentFormat::Toml)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("vm.yaml")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("vm")), None);
    }
}
