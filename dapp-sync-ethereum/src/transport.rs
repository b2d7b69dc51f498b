// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use alloy::{
    json_abi::Event,
    primitives::{Address, TxHash},
    rpc::types::eth::request::{TransactionInput, TransactionRequest},
};
use async_trait::async_trait;
use dapp_sync::{
    data_types::{ContractCall, ContractEvent, PendingAction, Token},
    transport::EventStream,
    ContractTransport, Error,
};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::mpsc::{self, UnboundedSender},
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    abi::ContractAbi,
    client::EthereumClient,
    common::{parse_log, EthereumServiceError},
};

/// The default interval between two polls for new events.
pub const DEFAULT_EVENT_POLL_MS: u64 = 2000;

/// Settings of the JSON-RPC transport.
#[derive(Clone, Debug, PartialEq, Eq, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthereumTransportConfig {
    /// How often to ask the node for new contract events, in milliseconds.
    #[arg(
        long = "event-poll-ms",
        default_value_t = DEFAULT_EVENT_POLL_MS,
        env = "DAPP_SYNC_EVENT_POLL_MS"
    )]
    #[serde(default = "default_event_poll_ms")]
    pub event_poll_ms: u64,
}

fn default_event_poll_ms() -> u64 {
    DEFAULT_EVENT_POLL_MS
}

impl Default for EthereumTransportConfig {
    fn default() -> Self {
        Self {
            event_poll_ms: DEFAULT_EVENT_POLL_MS,
        }
    }
}

impl EthereumTransportConfig {
    pub fn poll_interval(&self) -> Result<Duration, Error> {
        if self.event_poll_ms == 0 {
            return Err(Error::Config(
                "the event poll interval must be positive".into(),
            ));
        }
        Ok(Duration::from_millis(self.event_poll_ms))
    }
}

/// A deployed contract reached through an Ethereum node. Events are delivered by polling
/// the node's logs; the pollers stop when the transport is dropped.
pub struct EthereumTransport {
    client: Arc<EthereumClient>,
    abi: Arc<ContractAbi>,
    address: Address,
    poll_interval: Duration,
    cancellation_token: CancellationToken,
}

impl EthereumTransport {
    pub fn new(
        client: Arc<EthereumClient>,
        abi: ContractAbi,
        address: Address,
        config: &EthereumTransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            client,
            abi: Arc::new(abi),
            address,
            poll_interval: config.poll_interval()?,
            cancellation_token: CancellationToken::new(),
        })
    }
}

impl Drop for EthereumTransport {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

#[async_trait]
impl ContractTransport for EthereumTransport {
    fn address(&self) -> Address {
        self.address
    }

    async fn call(&self, call: &ContractCall) -> Result<Vec<Token>, Error> {
        let data = self.abi.encode_call(call)?;
        let output = self.client.non_executive_call(self.address, data).await?;
        Ok(self.abi.decode_output(call, &output)?)
    }

    async fn send(&self, action: PendingAction) -> Result<TxHash, Error> {
        let data = self.abi.encode_call(&action.call)?;
        let parameters = action.parameters;
        let mut tx = TransactionRequest::default()
            .from(parameters.from)
            .to(self.address)
            .input(TransactionInput::new(data))
            .gas_price(parameters.gas_price);
        if let Some(value) = parameters.value {
            tx = tx.value(value);
        }
        Ok(self.client.send_transaction(tx).await?)
    }

    fn subscribe(&self, event_name: &str) -> Result<EventStream, Error> {
        let event = self.abi.event(event_name)?.clone();
        let (sender, receiver) = mpsc::unbounded_channel();
        let poller = EventPoller {
            client: self.client.clone(),
            address: self.address,
            event,
            sender,
            next_block: None,
        };
        tokio::spawn(poller.run(self.poll_interval, self.cancellation_token.child_token()));
        Ok(receiver)
    }
}

/// Forwards the new logs of one event to a subscriber.
struct EventPoller {
    client: Arc<EthereumClient>,
    address: Address,
    event: Event,
    sender: UnboundedSender<ContractEvent>,
    /// The first block not read yet. Unknown until the first poll: only the events of
    /// later blocks are delivered.
    next_block: Option<u64>,
}

impl EventPoller {
    async fn run(mut self, poll_interval: Duration, cancellation_token: CancellationToken) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = cancellation_token.cancelled() => break,
                () = self.sender.closed() => break,
                _ = interval.tick() => {}
            }
            if let Err(error) = self.poll().await {
                warn!(%error, event = %self.event.name, "failed to poll for events");
            }
        }
        info!(event = %self.event.name, "event subscription ended");
    }

    async fn poll(&mut self) -> Result<(), EthereumServiceError> {
        let latest = self.client.get_block_number().await?;
        let Some(from_block) = self.next_block else {
            self.next_block = Some(latest + 1);
            return Ok(());
        };
        if latest < from_block {
            return Ok(());
        }
        let logs = self
            .client
            .read_events(self.address, self.event.selector(), from_block, latest)
            .await?;
        debug!(from_block, latest, count = logs.len(), "read event logs");
        for log in logs.iter().filter(|log| !log.removed) {
            match parse_log(&self.event, log) {
                Ok(event) => {
                    if self.sender.send(event).is_err() {
                        break;
                    }
                }
                Err(error) => warn!(%error, "skipping undecodable log"),
            }
        }
        self.next_block = Some(latest + 1);
        Ok(())
    }
}
