// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Display;

use vm_spec_types::{CpuRange, MemorySlots};

use crate::error::RangeViolation;

pub const CPUS_PATH: &str = ".spec.guest.cpus";
pub const MEMORY_SLOTS_PATH: &str = ".spec.guest.memorySlots";

/// Checks that `value` lies within `[min, max]`, inclusive at both ends.
///
/// The lower bound is checked first, so if `min > max` a value below both is
/// reported against `min`.
pub fn check_range<T: PartialOrd + Display>(
    path: &'static str,
    min: T,
    value: T,
    max: T,
) -> Result<(), RangeViolation> {
    if value < min {
        return Err(RangeViolation::BelowMin {
            path,
            value: value.to_string(),
            min: min.to_string(),
        });
    }

    if value > max {
        return Err(RangeViolation::AboveMax {
            path,
            value: value.to_string(),
            max: max.to_string(),
        });
    }

    Ok(())
}

pub(crate) fn check_cpus(cpus: &CpuRange) -> Result<(), RangeViolation> {
    check_range(CPUS_PATH, cpus.min, cpus.use_, cpus.max)
}

pub(crate) fn check_memory_slots(
    slots: &MemorySlots,
) -> Result<(), RangeViolation> {
    check_range(MEMORY_SLOTS_PATH, slots.min, slots.use_, slots.max)
}
