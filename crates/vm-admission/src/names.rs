// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Names that user-supplied disks and ports may not take.

use vm_spec_types::{Disk, Port};

use crate::error::AdmissionError;

/// Volume names the VM runner mounts for its own use.
pub const RESERVED_DISK_NAMES: &[&str] = &[
    "virtualmachineimages",
    "rootdisk",
    "runtime",
    "swapdisk",
    "sysfscgroup",
    "containerdsock",
    "ssh-privatekey",
    "ssh-publickey",
    "ssh-authorized-keys",
];

/// Disk names become volume labels inside the guest, which are limited in
/// length.
pub const MAX_DISK_NAME_LEN: usize = 32;

/// The hypervisor's control channel.
pub const RESERVED_PORT_NAME: &str = "qmp";

/// Rejects the first disk whose name is reserved or too long.
pub fn check_disk_names(disks: &[Disk]) -> Result<(), AdmissionError> {
    for disk in disks {
        if RESERVED_DISK_NAMES.contains(&disk.name.as_str()) {
            return Err(AdmissionError::ReservedDiskName(disk.name.clone()));
        }

        if disk.name.len() > MAX_DISK_NAME_LEN {
            return Err(AdmissionError::DiskNameTooLong {
                name: disk.name.clone(),
                max: MAX_DISK_NAME_LEN,
            });
        }
    }

    Ok(())
}

pub fn check_port_names(ports: &[Port]) -> Result<(), AdmissionError> {
    match ports.iter().find(|port| port.name == RESERVED_PORT_NAME) {
        Some(port) => Err(AdmissionError::ReservedPortName(port.name.clone())),
        None => Ok(()),
    }
}
