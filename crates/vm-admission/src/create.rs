// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use vm_spec_types::VirtualMachineSpec;

use crate::error::AdmissionError;
use crate::names::{check_disk_names, check_port_names};
use crate::range::{check_cpus, check_memory_slots};
use crate::Warnings;

pub(crate) const GUEST_PATH: &str = ".spec.guest";

/// Checks a spec that is about to be created.
pub fn validate_create(
    spec: &VirtualMachineSpec,
) -> Result<Warnings, AdmissionError> {
    let guest = &spec.guest;

    check_cpus(&guest.cpus)?;

    if let Some(provider) = guest.memory_provider {
        guest
            .validate_for_memory_provider(provider)
            .map_err(|e| AdmissionError::delegated(GUEST_PATH, e))?;
    }

    check_memory_slots(&guest.memory_slots)?;
    check_disk_names(&spec.disks)?;
    check_port_names(&guest.ports)?;

    if let Some(settings) = &guest.settings {
        if settings.swap.is_some() && settings.swap_info.is_some() {
            return Err(AdmissionError::ConflictingSwapConfig);
        }
    }

    Ok(Warnings::new())
}
