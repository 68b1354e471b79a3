// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Admission checks for VirtualMachine specs.
//!
//! Each check is a pure function of the spec (or pair of specs) it is given:
//! nothing is cached between calls and inputs are only ever borrowed. The
//! first rule a spec breaks is reported; later rules are not evaluated.

mod create;
pub mod error;
pub mod names;
pub mod range;
pub mod review;
mod update;

#[cfg(test)]
mod testutil;

use vm_spec_types::VirtualMachineSpec;

pub use create::validate_create;
pub use error::{AdmissionError, DelegatedError, RangeViolation};
pub use review::{AdmissionRequest, AdmissionResponse, Operation, Reviewer};
pub use update::validate_update;

/// Non-fatal messages returned alongside an admission decision. None of the
/// current checks produce any.
pub type Warnings = Vec<String>;

/// Checks a spec that is about to be deleted. Deletion is never refused.
pub fn validate_delete(
    _spec: &VirtualMachineSpec,
) -> Result<Warnings, AdmissionError> {
    Ok(Warnings::new())
}

/// The admission checks, as methods on the spec being admitted.
pub trait AdmissionValidator {
    fn validate_create(&self) -> Result<Warnings, AdmissionError>;

    /// Checks a change to `self` from `old`.
    fn validate_update(&self, old: &Self) -> Result<Warnings, AdmissionError>;

    fn validate_delete(&self) -> Result<Warnings, AdmissionError>;
}

impl AdmissionValidator for VirtualMachineSpec {
    fn validate_create(&self) -> Result<Warnings, AdmissionError> {
        validate_create(self)
    }

    fn validate_update(&self, old: &Self) -> Result<Warnings, AdmissionError> {
        validate_update(old, self)
    }

    fn validate_delete(&self) -> Result<Warnings, AdmissionError> {
        validate_delete(self)
    }
}
