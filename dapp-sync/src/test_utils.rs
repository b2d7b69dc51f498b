// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::{
    data_types::{Address, ContractCall, ContractEvent, PendingAction, Token, TxHash, U256},
    provider::AccountProvider,
    transport::{ContractTransport, EventStream},
    Error,
};

/// The error message of a wallet when the user declines access.
pub const USER_REJECTED: &str = "User rejected the request.";

/// An account provider returning fixed accounts, or refusing access.
#[derive(Clone, Debug, Default)]
pub struct MockProvider {
    accounts: Arc<Mutex<Option<Vec<Address>>>>,
}

impl MockProvider {
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            accounts: Arc::new(Mutex::new(Some(accounts))),
        }
    }

    /// A provider whose user declines every request.
    pub fn denying() -> Self {
        Self::default()
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = Some(accounts);
    }

    pub fn deny(&self) {
        *self.accounts.lock().unwrap() = None;
    }
}

#[async_trait]
impl AccountProvider for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, Error> {
        self.accounts
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::provider(USER_REJECTED))
    }
}

#[derive(Debug, Default)]
struct MockTransportInner {
    outputs: HashMap<ContractCall, Vec<Token>>,
    calls: Vec<ContractCall>,
    sent: Vec<PendingAction>,
    subscribers: HashMap<String, Vec<UnboundedSender<ContractEvent>>>,
    fail_sends: bool,
}

/// A contract transport answering calls from a table of mocked outputs and recording
/// every transaction.
#[derive(Clone, Debug, Default)]
pub struct MockTransport {
    address: Address,
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            inner: Arc::default(),
        }
    }

    /// Makes `call` return `outputs`.
    pub fn set_outputs(&self, call: ContractCall, outputs: Vec<Token>) {
        self.lock().outputs.insert(call, outputs);
    }

    /// Makes the getter `function` return `value`.
    pub fn set_uint(&self, function: &str, value: U256) {
        self.set_outputs(ContractCall::getter(function), vec![Token::Uint(value)]);
    }

    /// Makes `function(index)` return `outputs`.
    pub fn set_entry(&self, function: &str, index: usize, outputs: Vec<Token>) {
        self.set_outputs(
            ContractCall::new(function, vec![Token::Uint(U256::from(index))]),
            outputs,
        );
    }

    /// Makes every transaction fail from now on.
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// The read-only calls made so far, in order.
    pub fn calls(&self) -> Vec<ContractCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// The transactions sent so far, in order.
    pub fn sent(&self) -> Vec<PendingAction> {
        self.lock().sent.clone()
    }

    /// Delivers an event to every live subscription for it. Returns how many received it.
    pub fn emit(&self, event: ContractEvent) -> usize {
        let mut inner = self.lock();
        let Some(senders) = inner.subscribers.get_mut(&event.name) else {
            return 0;
        };
        senders.retain(|sender| sender.send(event.clone()).is_ok());
        senders.len()
    }

    /// Ends every subscription.
    pub fn close_subscriptions(&self) {
        self.lock().subscribers.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl ContractTransport for MockTransport {
    fn address(&self) -> Address {
        self.address
    }

    async fn call(&self, call: &ContractCall) -> Result<Vec<Token>, Error> {
        let mut inner = self.lock();
        inner.calls.push(call.clone());
        inner
            .outputs
            .get(call)
            .cloned()
            .ok_or_else(|| Error::transport(format!("execution reverted: {call}")))
    }

    async fn send(&self, action: PendingAction) -> Result<TxHash, Error> {
        let mut inner = self.lock();
        if inner.fail_sends {
            return Err(Error::transport("transaction underpriced"));
        }
        inner.sent.push(action);
        let nonce = u8::try_from(inner.sent.len()).unwrap_or(u8::MAX);
        Ok(TxHash::with_last_byte(nonce))
    }

    fn subscribe(&self, event_name: &str) -> Result<EventStream, Error> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock()
            .subscribers
            .entry(event_name.to_owned())
            .or_default()
            .push(sender);
        Ok(receiver)
    }
}

/// The outputs of the auction's `entries` getter.
pub fn auction_entry(signer: Address, name: &str, timestamp: u64, bid: u64) -> Vec<Token> {
    vec![
        Token::Address(signer),
        Token::from(name),
        Token::from(timestamp),
        Token::from(bid),
    ]
}

/// The outputs of the guestbook's `gb` getter.
pub fn guestbook_entry(
    signer: Address,
    name: &str,
    email: &str,
    message: &str,
    timestamp: u64,
    bounty: u64,
) -> Vec<Token> {
    vec![
        Token::Address(signer),
        Token::from(name),
        Token::from(email),
        Token::from(message),
        Token::from(timestamp),
        Token::from(bounty),
    ]
}

/// An event carrying a single value, as both contracts emit.
pub fn value_event(name: &str, value: u64) -> ContractEvent {
    ContractEvent {
        name: name.to_owned(),
        values: vec![Token::from(value)],
        block_number: None,
    }
}
