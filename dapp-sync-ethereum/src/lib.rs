// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! This module connects the synchronizer to an Ethereum node over JSON-RPC.

pub mod abi;
pub mod client;
pub mod common;
pub mod transport;

pub use crate::{
    abi::ContractAbi,
    client::EthereumClient,
    common::EthereumServiceError,
    transport::{EthereumTransport, EthereumTransportConfig},
};
