// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! This module keeps a user-facing display consistent with the state of a deployed
//! smart contract, and mediates the user's actions on that contract.
//!
//! A [`Synchronizer`] is parameterized by an [`Integration`] (which values and entries to
//! show, which checks guard which actions) and talks to the outside world through an
//! [`AccountProvider`], a [`ContractTransport`] and a [`DisplaySurface`].

pub mod config;
pub mod countdown;
pub mod data_types;
pub mod display;
mod error;
pub mod integration;
pub mod provider;
pub mod synchronizer;
pub mod time;
pub mod transport;

/// Helper types for tests.
#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use crate::{
    config::SynchronizerConfig,
    display::DisplaySurface,
    error::Error,
    integration::Integration,
    provider::AccountProvider,
    synchronizer::{SyncContext, Synchronizer, SynchronizerHandle, Trigger},
    transport::ContractTransport,
};
