// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Guest OS settings, including the two ways of asking for swap.
//!
//! Swap was first configured with a bare size (`swap`). The structured
//! `swapInfo` form replaced it, but both are still accepted on the wire; use
//! [`GuestSettings::effective_swap_info`] to get a single normalized view.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quantity::ByteQuantity;

#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GuestSettings {
    /// Kernel parameters to set at boot, in `key=value` form.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sysctl: Vec<String>,

    /// Legacy swap size. Mutually exclusive with `swap_info`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<ByteQuantity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_info: Option<SwapInfo>,
}

/// A structured description of the guest's swap device.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema,
)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SwapInfo {
    pub size: ByteQuantity,

    /// If true, the swap device is created but not enabled inside the guest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_swapon: Option<bool>,

    /// If true, the swap device is recreated at `size` whenever the VM
    /// restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resize_swap_on_restart: Option<bool>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SwapInfoError {
    #[error("cannot have both 'swap' and 'swapInfo' enabled")]
    ConflictingSwapFields,
}

impl GuestSettings {
    /// Returns a copy of these settings with both swap fields cleared.
    pub fn without_swap_fields(&self) -> GuestSettings {
        GuestSettings { swap: None, swap_info: None, ..self.clone() }
    }

    /// Derives the swap configuration these settings describe, whichever of
    /// the two swap fields it was written in.
    pub fn effective_swap_info(
        &self,
    ) -> Result<Option<SwapInfo>, SwapInfoError> {
        match (&self.swap, &self.swap_info) {
            (Some(_), Some(_)) => Err(SwapInfoError::ConflictingSwapFields),
            (_, Some(info)) => Ok(Some(info.clone())),
            (Some(size), None) => Ok(Some(SwapInfo {
                size: *size,
                skip_swapon: None,
                resize_swap_on_restart: None,
            })),
            (None, None) => Ok(None),
        }
    }
}
