// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! What differs from one contract page to another: which values are displayed, how
//! entries are rendered, and which local checks guard each action.

pub mod auction;
pub mod guestbook;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use self::{
    auction::{Auction, AuctionAction},
    guestbook::{Guestbook, GuestbookAction},
};
use crate::{
    data_types::{Address, ContractCall, EntryRecord, Token, U256},
    display::Node,
    time::Clock,
    transport::ContractTransport,
    Error,
};

/// The element showing the active account.
pub const ACCOUNT_ELEMENT: &str = "account";

/// The class of the blocks rendered for entries.
pub const ENTRY_CLASS: &str = "entry";

/// A contract value rendered as an amount of wei into its own element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarField {
    /// The contract getter.
    pub function: &'static str,
    /// The element showing the value.
    pub element: &'static str,
}

impl ScalarField {
    pub fn call(&self) -> ContractCall {
        ContractCall::getter(self.function)
    }

    pub fn render(value: U256) -> String {
        format!("{value} Wei")
    }
}

/// Where newly rendered entries go in their container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion {
    /// Each entry goes before the previous ones: the last index read is shown first.
    Prepend,
    /// Each entry goes after the previous ones: the first index read is shown first.
    Append,
}

/// How the list of entries is read and laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntrySource {
    /// The contract getter taking the entry index.
    pub function: &'static str,
    /// The container element.
    pub element: &'static str,
    /// A getter returning the number of entries recorded so far, if the contract has one.
    pub total_function: Option<&'static str>,
    pub insertion: Insertion,
    /// How many entries to show unless configured otherwise.
    pub default_count: usize,
}

impl EntrySource {
    pub fn call(&self, index: usize) -> ContractCall {
        ContractCall::new(self.function, vec![Token::Uint(U256::from(index))])
    }
}

/// A countdown towards a deadline read from the contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountdownSource {
    /// The getter returning the deadline as Unix seconds.
    pub function: &'static str,
    pub element: &'static str,
    /// Shown once the deadline has passed.
    pub over_message: &'static str,
}

/// The outcome of evaluating an action's local guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    /// Send this call, with this value attached.
    Submit {
        call: ContractCall,
        value: Option<U256>,
    },
    /// Do not send anything; alert the user with this message.
    Reject(&'static str),
}

/// What an action's guard may look at.
pub struct GuardContext<'a> {
    pub account: Address,
    pub transport: &'a dyn ContractTransport,
    pub clock: &'a dyn Clock,
}

/// One kind of contract page.
#[async_trait]
pub trait Integration: Send + Sync + 'static {
    /// The user actions of this page.
    type Action: fmt::Debug + Send + 'static;

    /// A short name, for logs.
    fn name(&self) -> &'static str;

    /// The contract event announcing a new entry. Its first value is the new value of
    /// [`Integration::scalar`].
    fn event_name(&self) -> &'static str;

    /// The value refreshed on every new entry.
    fn scalar(&self) -> ScalarField;

    fn entries(&self) -> EntrySource;

    fn countdown(&self) -> Option<CountdownSource> {
        None
    }

    /// Read-only getters without arguments that describe the contract's current state.
    fn status_getters(&self) -> &'static [&'static str] {
        &[]
    }

    /// Builds a record from the outputs of the entry getter.
    fn parse_entry(&self, outputs: Vec<Token>) -> Result<EntryRecord, Error>;

    fn render_entry(&self, entry: &EntryRecord) -> Node;

    /// Reads what the action's guard needs, evaluates it, and decides what to send.
    async fn plan(&self, action: Self::Action, context: GuardContext<'_>) -> Result<Plan, Error>;

    /// The identifiers of every element this page renders into.
    fn elements(&self) -> Vec<&'static str> {
        let mut elements = vec![
            ACCOUNT_ELEMENT,
            self.scalar().element,
            self.entries().element,
        ];
        elements.extend(self.countdown().map(|countdown| countdown.element));
        elements
    }
}

/// Formats Unix seconds the way browsers print UTC dates, e.g.
/// `Thu, 01 Jan 1970 00:00:00 GMT`.
pub fn format_utc(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
        .map_or_else(
            || "Invalid Date".to_owned(),
            |date| date.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        )
}

/// Reads the outputs of a getter one by one, in declaration order.
struct Outputs {
    function: &'static str,
    values: std::vec::IntoIter<Token>,
}

impl Outputs {
    fn new(function: &'static str, values: Vec<Token>, expected_len: usize) -> Result<Self, Error> {
        if values.len() != expected_len {
            return Err(Error::unexpected_output(function, "one value per record field"));
        }
        Ok(Self {
            function,
            values: values.into_iter(),
        })
    }

    fn next(&mut self) -> Result<Token, Error> {
        self.values
            .next()
            .ok_or_else(|| Error::unexpected_output(self.function, "more record fields"))
    }

    fn address(&mut self) -> Result<Address, Error> {
        self.next()?
            .as_address()
            .ok_or_else(|| Error::unexpected_output(self.function, "an address"))
    }

    fn string(&mut self) -> Result<String, Error> {
        self.next()?
            .into_string()
            .ok_or_else(|| Error::unexpected_output(self.function, "a string"))
    }

    fn uint(&mut self) -> Result<U256, Error> {
        self.next()?
            .as_uint()
            .ok_or_else(|| Error::unexpected_output(self.function, "a uint256"))
    }

    fn timestamp(&mut self) -> Result<u64, Error> {
        u64::try_from(self.uint()?)
            .map_err(|_| Error::unexpected_output(self.function, "a timestamp in seconds"))
    }
}
