// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extra disks mounted into the guest.

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::quantity::ByteQuantity;

/// A disk attached to the guest in addition to its root disk.
//
// The source is flattened so that documents name the disk kind directly,
// e.g. `{ "name": "cache", "emptyDisk": { "size": "1Gi" } }`. Deserialization
// goes through `RawDisk` so that a disk naming zero or several sources is
// rejected instead of keeping whichever one serde sees first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    pub name: String,

    #[serde(default)]
    pub mount_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,

    #[serde(flatten)]
    pub source: DiskSource,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DiskSourceError {
    #[error(
        "disk '{0}' has no source; expected one of emptyDisk, configMap, \
         secret or tmpfs"
    )]
    Missing(String),

    #[error("disk '{name}' has more than one source: {}", .kinds.join(", "))]
    Multiple { name: String, kinds: Vec<&'static str> },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawDisk {
    name: String,
    #[serde(default)]
    mount_path: String,
    #[serde(default)]
    read_only: Option<bool>,
    #[serde(default)]
    empty_disk: Option<EmptyDiskSource>,
    #[serde(default)]
    config_map: Option<ConfigMapSource>,
    #[serde(default)]
    secret: Option<SecretSource>,
    #[serde(default)]
    tmpfs: Option<TmpfsSource>,
}

impl TryFrom<RawDisk> for Disk {
    type Error = DiskSourceError;

    fn try_from(raw: RawDisk) -> Result<Self, Self::Error> {
        let RawDisk {
            name,
            mount_path,
            read_only,
            empty_disk,
            config_map,
            secret,
            tmpfs,
        } = raw;

        let mut sources: Vec<(&'static str, DiskSource)> = [
            ("emptyDisk", empty_disk.map(DiskSource::EmptyDisk)),
            ("configMap", config_map.map(DiskSource::ConfigMap)),
            ("secret", secret.map(DiskSource::Secret)),
            ("tmpfs", tmpfs.map(DiskSource::Tmpfs)),
        ]
        .into_iter()
        .filter_map(|(kind, source)| source.map(|s| (kind, s)))
        .collect();

        match sources.len() {
            0 => Err(DiskSourceError::Missing(name)),
            1 => {
                let (_, source) = sources.remove(0);
                Ok(Self { name, mount_path, read_only, source })
            }
            _ => Err(DiskSourceError::Multiple {
                name,
                kinds: sources.into_iter().map(|(kind, _)| kind).collect(),
            }),
        }
    }
}

impl<'d> Deserialize<'d> for Disk {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'d>,
    {
        let raw = RawDisk::deserialize(deserializer)?;
        Disk::try_from(raw).map_err(de::Error::custom)
    }
}

/// Where a disk's contents come from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DiskSource {
    /// A fresh, empty filesystem.
    EmptyDisk(EmptyDiskSource),

    /// The keys of a ConfigMap, one file per key.
    ConfigMap(ConfigMapSource),

    /// The keys of a Secret, one file per key.
    Secret(SecretSource),

    /// A memory-backed filesystem.
    Tmpfs(TmpfsSource),
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EmptyDiskSource {
    pub size: ByteQuantity,

    /// Pass guest discards through to the backing storage.
    #[serde(default)]
    pub discard: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConfigMapSource {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<KeyToPath>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SecretSource {
    pub secret_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<KeyToPath>,
}

/// Maps one key of a ConfigMap or Secret to a relative file path.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct KeyToPath {
    pub key: String,
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TmpfsSource {
    pub size: ByteQuantity,
}
