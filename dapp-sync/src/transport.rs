// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    data_types::{Address, ContractCall, ContractEvent, PendingAction, Token, TxHash, U256},
    Error,
};

/// The stream of decoded events delivered by a subscription.
pub type EventStream = UnboundedReceiver<ContractEvent>;

/// Access to one deployed contract: read-only calls, transactions and events.
#[async_trait]
pub trait ContractTransport: Send + Sync {
    /// The address of the deployed contract.
    fn address(&self) -> Address;

    /// Executes a read-only call and returns the decoded outputs.
    async fn call(&self, call: &ContractCall) -> Result<Vec<Token>, Error>;

    /// Sends a state-changing call and waits until the network accepts it.
    async fn send(&self, action: PendingAction) -> Result<TxHash, Error>;

    /// Starts delivering the contract's `event_name` events. The subscription ends when
    /// the returned stream is dropped.
    fn subscribe(&self, event_name: &str) -> Result<EventStream, Error>;
}

/// Typed helpers over [`ContractTransport::call`].
#[async_trait]
pub trait ContractTransportExt: ContractTransport {
    /// Calls a function that returns exactly one value.
    async fn call_single(&self, call: &ContractCall) -> Result<Token, Error> {
        let mut outputs = self.call(call).await?;
        if outputs.len() != 1 {
            return Err(Error::unexpected_output(&call.function, "a single value"));
        }
        Ok(outputs.remove(0))
    }

    /// Calls a function that returns a single `uint256`.
    async fn read_uint(&self, call: &ContractCall) -> Result<U256, Error> {
        self.call_single(call)
            .await?
            .as_uint()
            .ok_or_else(|| Error::unexpected_output(&call.function, "a uint256"))
    }
}

impl<T: ContractTransport + ?Sized> ContractTransportExt for T {}
