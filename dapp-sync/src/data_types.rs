// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Values exchanged between the synchronizer, the contract transport and the display.

use std::fmt;

pub use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// A single decoded ABI value, used both for call arguments and for call outputs and
/// event payloads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Address(Address),
    Uint(U256),
    String(String),
    Bool(bool),
}

impl Token {
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(address) => Some(*address),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Token::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Address(address) => write!(f, "{address}"),
            Token::Uint(value) => write!(f, "{value}"),
            Token::String(value) => write!(f, "{value}"),
            Token::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<Address> for Token {
    fn from(address: Address) -> Self {
        Token::Address(address)
    }
}

impl From<U256> for Token {
    fn from(value: U256) -> Self {
        Token::Uint(value)
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Token::Uint(U256::from(value))
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::String(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::String(value.to_owned())
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Token::Bool(value)
    }
}

/// An invocation of a contract function by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractCall {
    pub function: String,
    pub args: Vec<Token>,
}

impl ContractCall {
    pub fn new(function: impl Into<String>, args: Vec<Token>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }

    /// A call without arguments.
    pub fn getter(function: impl Into<String>) -> Self {
        Self::new(function, Vec::new())
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function)?;
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            match arg {
                Token::String(value) => write!(f, "{value:?}")?,
                other => write!(f, "{other}")?,
            }
        }
        write!(f, ")")
    }
}

/// The parameters attached to a state-changing call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionParameters {
    pub from: Address,
    pub gas_price: u128,
    pub value: Option<U256>,
}

/// A transaction that passed its local guard and is about to be sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub call: ContractCall,
    pub parameters: TransactionParameters,
}

/// A decoded event emitted by the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    pub values: Vec<Token>,
    pub block_number: Option<u64>,
}

/// The read-only values of a contract, as of one read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    /// Getter names and their values, in the order they were read.
    pub values: Vec<(String, Token)>,
}

impl ContractSnapshot {
    pub fn get(&self, getter: &str) -> Option<&Token> {
        self.values
            .iter()
            .find_map(|(name, value)| (name == getter).then_some(value))
    }
}

impl fmt::Display for ContractSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (name, value)) in self.values.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// One historical record read from the contract, e.g. a bid or a guestbook signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub signer: Address,
    /// The free-text fields of the record, in the contract's field order.
    pub texts: Vec<String>,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// The amount attached to the record, in wei.
    pub amount: U256,
}

/// The identity under which actions are submitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub active_account: Option<Address>,
}

/// What happened to a user action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The transaction was accepted by the network.
    Submitted(TxHash),
    /// The local guard failed; the user was shown this message.
    Rejected(&'static str),
}

impl ActionOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, ActionOutcome::Submitted(_))
    }
}
