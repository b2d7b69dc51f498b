// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy::{
    primitives::{Address, Bytes, TxHash, B256},
    providers::{Provider, ProviderBuilder},
    rpc::types::eth::{
        request::{TransactionInput, TransactionRequest},
        Filter, Log,
    },
};
use async_trait::async_trait;
use dapp_sync::AccountProvider;
use tracing::debug;
use url::Url;

use crate::common::EthereumServiceError;

/// The Ethereum node and the provider used for accessing it. The node manages the keys:
/// its accounts sign the transactions sent through it.
pub struct EthereumClient {
    provider: Box<dyn Provider>,
}

impl EthereumClient {
    /// Connects to an existing Ethereum node.
    pub fn new(url: &str) -> Result<Self, EthereumServiceError> {
        let rpc_url = Url::parse(url)?;
        let provider = ProviderBuilder::new().connect_http(rpc_url);
        Ok(Self {
            provider: Box::new(provider),
        })
    }

    pub async fn get_accounts(&self) -> Result<Vec<Address>, EthereumServiceError> {
        Ok(self.provider.get_accounts().await?)
    }

    pub async fn get_block_number(&self) -> Result<u64, EthereumServiceError> {
        Ok(self.provider.get_block_number().await?)
    }

    /// Reads the logs emitted by `contract_address` with the topic `event_signature`
    /// between the two blocks, both included.
    pub async fn read_events(
        &self,
        contract_address: Address,
        event_signature: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Log>, EthereumServiceError> {
        let filter = Filter::new()
            .address(contract_address)
            .event_signature(event_signature)
            .from_block(from_block)
            .to_block(to_block);
        Ok(self.provider.get_logs(&filter).await?)
    }

    /// Executes a call without creating a transaction.
    pub async fn non_executive_call(
        &self,
        contract_address: Address,
        data: Bytes,
    ) -> Result<Bytes, EthereumServiceError> {
        let tx = TransactionRequest::default()
            .to(contract_address)
            .input(TransactionInput::new(data));
        Ok(self.provider.call(tx).await?)
    }

    /// Has the node sign and broadcast a transaction, then waits for its receipt.
    pub async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TxHash, EthereumServiceError> {
        let pending = self.provider.send_transaction(tx).await?;
        debug!(tx_hash = %pending.tx_hash(), "waiting for the transaction receipt");
        Ok(pending.watch().await?)
    }
}

#[async_trait]
impl AccountProvider for EthereumClient {
    async fn request_accounts(&self) -> Result<Vec<Address>, dapp_sync::Error> {
        self.get_accounts().await.map_err(dapp_sync::Error::provider)
    }
}
