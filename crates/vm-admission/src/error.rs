// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reasons a VM spec can be refused admission.

use thiserror::Error;
use vm_spec_types::{MemoryProviderError, SwapInfoError};

/// A resource's in-use amount fell outside its `[min, max]` bounds.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RangeViolation {
    #[error(
        "{path}.use ({value}) should be greater than or equal to the \
         {path}.min ({min})"
    )]
    BelowMin { path: &'static str, value: String, min: String },

    #[error(
        "{path}.use ({value}) should be less than or equal to the \
         {path}.max ({max})"
    )]
    AboveMax { path: &'static str, value: String, max: String },
}

/// A failure reported by one of the spec's own field checks, which admission
/// passes along rather than evaluating itself.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DelegatedError {
    #[error(transparent)]
    MemoryProvider(#[from] MemoryProviderError),

    #[error(transparent)]
    SwapInfo(#[from] SwapInfoError),
}

/// The reason a spec, or a change to a spec, was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error(transparent)]
    RangeViolation(#[from] RangeViolation),

    #[error("'{0}' is reserved for .spec.disks[].name")]
    ReservedDiskName(String),

    #[error(
        "disk name '{name}' too long, should be less than or equal to {max}"
    )]
    DiskNameTooLong { name: String, max: usize },

    #[error("'{0}' is reserved name for .spec.guest.ports[].name")]
    ReservedPortName(String),

    #[error("cannot have both 'swap' and 'swapInfo' enabled")]
    ConflictingSwapConfig,

    #[error("{0} is immutable")]
    ImmutableFieldChanged(&'static str),

    #[error(".spec.guest.settings.{{swap,swapInfo}} is immutable")]
    ImmutableSwapTransition,

    #[error("{path}: {source}")]
    DelegatedValidationFailure {
        path: &'static str,
        #[source]
        source: DelegatedError,
    },
}

impl AdmissionError {
    pub(crate) fn delegated(
        path: &'static str,
        source: impl Into<DelegatedError>,
    ) -> Self {
        Self::DelegatedValidationFailure { path, source: source.into() }
    }
}
