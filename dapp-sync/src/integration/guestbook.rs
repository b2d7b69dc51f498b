// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use super::{
    format_utc, EntrySource, GuardContext, Insertion, Integration, Outputs, Plan, ScalarField,
    ENTRY_CLASS,
};
use crate::{
    data_types::{ContractCall, EntryRecord, Token, U256},
    display::Node,
    transport::ContractTransportExt as _,
    Error,
};

/// Signing pays the current bounty plus this many wei.
pub const BOUNTY_OFFSET: U256 = U256::from_limbs([10, 0, 0, 0]);

/// User actions on the guestbook page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuestbookAction {
    /// Signs the guestbook, paying slightly more than the current bounty.
    Sign {
        name: String,
        email: String,
        message: String,
    },
    /// Lets the owner collect the contract's balance.
    CashOut,
}

/// A guestbook whose first signatures are listed in order, next to the current bounty.
#[derive(Clone, Copy, Debug, Default)]
pub struct Guestbook;

#[async_trait]
impl Integration for Guestbook {
    type Action = GuestbookAction;

    fn name(&self) -> &'static str {
        "guestbook"
    }

    fn event_name(&self) -> &'static str {
        "Entry"
    }

    fn scalar(&self) -> ScalarField {
        ScalarField {
            function: "bounty",
            element: "bounty",
        }
    }

    fn entries(&self) -> EntrySource {
        EntrySource {
            function: "gb",
            element: "entries",
            total_function: None,
            insertion: Insertion::Append,
            default_count: 3,
        }
    }

    fn status_getters(&self) -> &'static [&'static str] {
        &["bounty", "owner"]
    }

    fn parse_entry(&self, outputs: Vec<Token>) -> Result<EntryRecord, Error> {
        let mut outputs = Outputs::new("gb", outputs, 6)?;
        let signer = outputs.address()?;
        let name = outputs.string()?;
        let email = outputs.string()?;
        let message = outputs.string()?;
        let timestamp = outputs.timestamp()?;
        let amount = outputs.uint()?;
        Ok(EntryRecord {
            signer,
            texts: vec![name, email, message],
            timestamp,
            amount,
        })
    }

    fn render_entry(&self, entry: &EntryRecord) -> Node {
        let text = |index: usize| entry.texts.get(index).map_or("", String::as_str);
        Node::block(
            ENTRY_CLASS,
            vec![
                Node::text(format!("{} <{}>", text(0), text(1))),
                Node::LineBreak,
                Node::text(entry.signer.to_string()),
                Node::LineBreak,
                Node::text(format!(
                    "signed on {} for {} Wei",
                    format_utc(entry.timestamp),
                    entry.amount
                )),
                Node::LineBreak,
                Node::text(text(2)),
            ],
        )
    }

    async fn plan(
        &self,
        action: GuestbookAction,
        context: GuardContext<'_>,
    ) -> Result<Plan, Error> {
        match action {
            GuestbookAction::Sign {
                name,
                email,
                message,
            } => {
                let bounty = context
                    .transport
                    .read_uint(&ContractCall::getter("bounty"))
                    .await?;
                Ok(Plan::Submit {
                    call: ContractCall::new(
                        "sign",
                        vec![
                            Token::String(name),
                            Token::String(email),
                            Token::String(message),
                        ],
                    ),
                    value: Some(bounty.saturating_add(BOUNTY_OFFSET)),
                })
            }
            // Only the owner may cash out, which the contract checks by itself.
            GuestbookAction::CashOut => Ok(Plan::Submit {
                call: ContractCall::getter("cashOut"),
                value: None,
            }),
        }
    }
}
