// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rules for changing an existing VM spec.
//!
//! Most of a VM's shape is fixed once it has been created; only the in-use
//! CPU and memory amounts (within their original bounds) and a handful of
//! scheduling fields may move. Swap configuration gets its own rule: it may
//! not change between two valid forms, but a spec whose stored swap fields
//! are contradictory may be repaired.

use vm_spec_types::{GuestSettings, SwapInfo, SwapInfoError, VirtualMachineSpec};

use crate::error::AdmissionError;
use crate::range::{check_cpus, check_memory_slots};
use crate::Warnings;

const SETTINGS_PATH: &str = ".spec.guest.settings";

/// A field that may not change once a VM has been created.
struct ImmutableField {
    path: &'static str,

    /// Returns true if the field has the same value in both specs.
    unchanged: fn(&VirtualMachineSpec, &VirtualMachineSpec) -> bool,
}

// Builds an `ImmutableField` from a projection of the spec. The projection
// may borrow from the spec or build a new value; either way its results are
// compared with `==`.
macro_rules! immutable {
    ($path:literal, |$spec:ident| $projection:expr) => {
        ImmutableField {
            path: $path,
            unchanged: |old, new| {
                fn project($spec: &VirtualMachineSpec) -> impl PartialEq + '_ {
                    $projection
                }
                project(old) == project(new)
            },
        }
    };
}

const IMMUTABLE_FIELDS: &[ImmutableField] = &[
    immutable!(".spec.guest.cpus.min", |s| s.guest.cpus.min),
    immutable!(".spec.guest.cpus.max", |s| s.guest.cpus.max),
    immutable!(".spec.guest.memorySlots.min", |s| s.guest.memory_slots.min),
    immutable!(".spec.guest.memorySlots.max", |s| s.guest.memory_slots.max),
    immutable!(".spec.guest.memoryProvider", |s| s.guest.memory_provider),
    immutable!(".spec.guest.ports", |s| &s.guest.ports),
    immutable!(".spec.guest.rootDisk", |s| &s.guest.root_disk),
    immutable!(".spec.guest.command", |s| &s.guest.command),
    immutable!(".spec.guest.args", |s| &s.guest.args),
    immutable!(".spec.guest.env", |s| &s.guest.env),
    // Swap may change under its own rule; see `check_swap_transition`.
    immutable!(".spec.guest.settings", |s| s
        .guest
        .settings
        .as_ref()
        .map(GuestSettings::without_swap_fields)),
    immutable!(".spec.disks", |s| &s.disks),
    immutable!(".spec.podResources", |s| &s.pod_resources),
    immutable!(".spec.enableAcceleration", |s| s.enable_acceleration),
    immutable!(".spec.enableSSH", |s| s.enable_ssh),
    immutable!(".spec.initScript", |s| &s.init_script),
];

/// Checks a change from `old` to `new`.
pub fn validate_update(
    old: &VirtualMachineSpec,
    new: &VirtualMachineSpec,
) -> Result<Warnings, AdmissionError> {
    if let Some(field) =
        IMMUTABLE_FIELDS.iter().find(|field| !(field.unchanged)(old, new))
    {
        return Err(AdmissionError::ImmutableFieldChanged(field.path));
    }

    check_swap_transition(old, new)?;

    // min and max are pinned by the table above; this catches `use` drifting
    // out of them.
    check_cpus(&new.guest.cpus)?;
    check_memory_slots(&new.guest.memory_slots)?;

    Ok(Warnings::new())
}

fn check_swap_transition(
    old: &VirtualMachineSpec,
    new: &VirtualMachineSpec,
) -> Result<(), AdmissionError> {
    // Settings can't appear or disappear (that's caught by the immutable
    // field table), so if the new spec has none, neither did the old one.
    let Some(new_settings) = &new.guest.settings else {
        return Ok(());
    };

    let new_swap = new_settings
        .effective_swap_info()
        .map_err(|e| AdmissionError::delegated(SETTINGS_PATH, e))?;

    match old_swap_info(old) {
        Ok(old_swap) if old_swap != new_swap => {
            Err(AdmissionError::ImmutableSwapTransition)
        }
        Ok(_) => Ok(()),

        // The stored spec is itself broken. Refusing here would leave the
        // object stuck in that state forever, so let a valid replacement
        // through.
        Err(_) => Ok(()),
    }
}

fn old_swap_info(
    old: &VirtualMachineSpec,
) -> Result<Option<SwapInfo>, SwapInfoError> {
    match &old.guest.settings {
        Some(settings) => settings.effective_swap_info(),
        None => Ok(None),
    }
}
