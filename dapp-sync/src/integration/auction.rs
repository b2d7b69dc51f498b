// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;

use super::{
    format_utc, CountdownSource, EntrySource, GuardContext, Insertion, Integration, Outputs,
    Plan, ScalarField, ENTRY_CLASS,
};
use crate::{
    data_types::{ContractCall, EntryRecord, Token, U256},
    display::Node,
    transport::ContractTransportExt as _,
    Error,
};

/// A new bid must exceed the highest bid by at least this much (0.005 ETH).
pub const MIN_BID_INCREMENT: U256 = U256::from_limbs([5_000_000_000_000_000, 0, 0, 0]);

pub const BID_TOO_LOW: &str = "Your bid must exceed the highest bid + 0.005 ETH";
pub const AUCTION_NOT_OVER: &str = "You cannot claim the prize yet.";
pub const NOTHING_TO_WITHDRAW: &str = "You do not have any bids to withdraw";
pub const BIDDING_OVER: &str = "Bidding is over...";

/// User actions on the auction page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuctionAction {
    /// Places a bid of `value` wei under `name`.
    Bid { name: String, value: U256 },
    /// Ends the auction to hand the prize to the winner.
    Claim,
    /// Recovers the funds of outbid bids.
    Withdraw,
}

/// An auction where the latest bids are listed newest first, next to a countdown to the
/// end of bidding.
#[derive(Clone, Copy, Debug, Default)]
pub struct Auction;

#[async_trait]
impl Integration for Auction {
    type Action = AuctionAction;

    fn name(&self) -> &'static str {
        "auction"
    }

    fn event_name(&self) -> &'static str {
        "NewEntry"
    }

    fn scalar(&self) -> ScalarField {
        ScalarField {
            function: "highestBid",
            element: "highestBid",
        }
    }

    fn entries(&self) -> EntrySource {
        EntrySource {
            function: "entries",
            element: "entries",
            total_function: Some("totalBids"),
            insertion: Insertion::Prepend,
            default_count: 4,
        }
    }

    fn countdown(&self) -> Option<CountdownSource> {
        Some(CountdownSource {
            function: "auctionEnd",
            element: "remaining",
            over_message: BIDDING_OVER,
        })
    }

    fn status_getters(&self) -> &'static [&'static str] {
        &[
            "highestBid",
            "highestBidder",
            "minimumBid",
            "totalBids",
            "auctionEnd",
            "ended",
        ]
    }

    fn parse_entry(&self, outputs: Vec<Token>) -> Result<EntryRecord, Error> {
        let mut outputs = Outputs::new("entries", outputs, 4)?;
        let signer = outputs.address()?;
        let name = outputs.string()?;
        let timestamp = outputs.timestamp()?;
        let amount = outputs.uint()?;
        Ok(EntryRecord {
            signer,
            texts: vec![name],
            timestamp,
            amount,
        })
    }

    fn render_entry(&self, entry: &EntryRecord) -> Node {
        let name = entry.texts.first().map_or("", String::as_str);
        Node::block(
            ENTRY_CLASS,
            vec![
                Node::text(format!("Name: {name}")),
                Node::LineBreak,
                Node::text(format!("Address: {}", entry.signer)),
                Node::LineBreak,
                Node::text(format!("Bid placed on: {}", format_utc(entry.timestamp))),
                Node::LineBreak,
                Node::text(format!("Bid Amount: {} Wei", entry.amount)),
                Node::LineBreak,
            ],
        )
    }

    async fn plan(&self, action: AuctionAction, context: GuardContext<'_>) -> Result<Plan, Error> {
        match action {
            AuctionAction::Bid { name, value } => {
                let highest_bid = context
                    .transport
                    .read_uint(&ContractCall::getter("highestBid"))
                    .await?;
                let minimum = highest_bid.saturating_add(MIN_BID_INCREMENT);
                if value < minimum {
                    return Ok(Plan::Reject(BID_TOO_LOW));
                }
                Ok(Plan::Submit {
                    call: ContractCall::new("bid", vec![Token::String(name)]),
                    value: Some(value),
                })
            }
            AuctionAction::Claim => {
                let auction_end = context
                    .transport
                    .read_uint(&ContractCall::getter("auctionEnd"))
                    .await?;
                let auction_end =
                    Duration::from_secs(u64::try_from(auction_end).unwrap_or(u64::MAX));
                // The prize can be claimed once the remaining time is negative.
                if context.clock.now() <= auction_end {
                    return Ok(Plan::Reject(AUCTION_NOT_OVER));
                }
                Ok(Plan::Submit {
                    call: ContractCall::getter("endAuction"),
                    value: None,
                })
            }
            AuctionAction::Withdraw => {
                let pending_returns = context
                    .transport
                    .read_uint(&ContractCall::new(
                        "pendingReturns",
                        vec![Token::Address(context.account)],
                    ))
                    .await?;
                if pending_returns.is_zero() {
                    return Ok(Plan::Reject(NOTHING_TO_WITHDRAW));
                }
                Ok(Plan::Submit {
                    call: ContractCall::getter("withdraw"),
                    value: None,
                })
            }
        }
    }
}
