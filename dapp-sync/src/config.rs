// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::Error;

/// The gas price attached to every transaction, in wei (127 gwei).
pub const DEFAULT_GAS_PRICE: u128 = 0x1D91CA3600;

/// Settings shared by every synchronizer, whatever the contract.
#[derive(Clone, Debug, PartialEq, Eq, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizerConfig {
    /// How many entries to read and render. Defaults to the integration's own count.
    #[serde(default)]
    #[arg(long = "entry-count", env = "DAPP_SYNC_ENTRY_COUNT")]
    pub entry_count: Option<usize>,

    /// The fixed gas price of state-changing calls, in wei.
    #[serde(default = "default_gas_price")]
    #[arg(
        long = "gas-price",
        default_value_t = DEFAULT_GAS_PRICE,
        env = "DAPP_SYNC_GAS_PRICE"
    )]
    pub gas_price: u128,
}

fn default_gas_price() -> u128 {
    DEFAULT_GAS_PRICE
}

impl Default for SynchronizerConfig {
    fn default() -> Self {
        Self {
            entry_count: None,
            gas_price: DEFAULT_GAS_PRICE,
        }
    }
}

impl SynchronizerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.entry_count == Some(0) {
            return Err(Error::Config("the entry count must be positive".into()));
        }
        if self.gas_price == 0 {
            return Err(Error::Config("the gas price must be positive".into()));
        }
        Ok(())
    }

    /// The number of entries to render, given the integration's default.
    pub fn entry_count_or(&self, default: usize) -> usize {
        self.entry_count.unwrap_or(default)
    }
}
