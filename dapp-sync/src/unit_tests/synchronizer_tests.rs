// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use assert_matches::assert_matches;
use tokio::time::sleep;

use super::{SyncContext, Synchronizer};
use crate::{
    config::{SynchronizerConfig, DEFAULT_GAS_PRICE},
    data_types::{
        ActionOutcome, Address, ContractCall, ContractEvent, PendingAction, Token,
        TransactionParameters, U256,
    },
    display::{MemorySurface, Node},
    integration::{
        auction::{AUCTION_NOT_OVER, BIDDING_OVER, BID_TOO_LOW, NOTHING_TO_WITHDRAW},
        Auction, AuctionAction, Guestbook, GuestbookAction, Integration,
    },
    test_utils::{auction_entry, guestbook_entry, value_event, MockProvider, MockTransport},
    time::TestClock,
    Error,
};

const ALICE: Address = Address::repeat_byte(0xa1);
const BOB: Address = Address::repeat_byte(0xb0);
const CONTRACT: Address = Address::repeat_byte(0xcc);
const NOW: u64 = 1_700_000_000;
const FINNEY_5: u64 = 5_000_000_000_000_000;

struct TestSetup<I: Integration> {
    synchronizer: Synchronizer<I>,
    provider: MockProvider,
    transport: MockTransport,
    surface: MemorySurface,
    clock: TestClock,
}

impl<I: Integration> TestSetup<I> {
    fn new(integration: I) -> Self {
        Self::with_config(integration, SynchronizerConfig::default())
    }

    fn with_config(integration: I, config: SynchronizerConfig) -> Self {
        let provider = MockProvider::with_accounts(vec![ALICE, BOB]);
        let transport = MockTransport::new(CONTRACT);
        let surface = MemorySurface::with_elements(integration.elements());
        let clock = TestClock::at_secs(NOW);
        let context = SyncContext {
            provider: Arc::new(provider.clone()),
            transport: Arc::new(transport.clone()),
            surface: Arc::new(surface.clone()),
            clock: Arc::new(clock.clone()),
        };
        let synchronizer = Synchronizer::new(context, integration, &config).unwrap();
        Self {
            synchronizer,
            provider,
            transport,
            surface,
            clock,
        }
    }

    /// The first line of every rendered entry, in display order.
    fn entry_headlines(&self) -> Vec<String> {
        self.surface
            .children("entries")
            .unwrap()
            .into_iter()
            .map(|node| match node {
                Node::Block { children, .. } => children[0].to_string(),
                other => panic!("unexpected node in the entry list: {other:?}"),
            })
            .collect()
    }
}

fn auction_with_bids(total: u64) -> TestSetup<Auction> {
    let setup = TestSetup::new(Auction);
    setup.transport.set_uint("highestBid", U256::from(100));
    setup.transport.set_uint("totalBids", U256::from(total));
    setup.transport.set_uint("auctionEnd", U256::from(NOW + 125));
    for index in 0..4 {
        setup.transport.set_entry(
            "entries",
            index,
            auction_entry(ALICE, &format!("bidder{index}"), NOW, 100 + index as u64),
        );
    }
    setup
}

fn guestbook_with_entries() -> TestSetup<Guestbook> {
    let setup = TestSetup::new(Guestbook);
    setup.transport.set_uint("bounty", U256::from(1000));
    for index in 0..3 {
        setup.transport.set_entry(
            "gb",
            index,
            guestbook_entry(
                BOB,
                &format!("guest{index}"),
                "guest@example.com",
                "Hello",
                0,
                10,
            ),
        );
    }
    setup
}

#[tokio::test]
async fn test_refresh_account_uses_first_account() {
    let setup = TestSetup::new(Auction);
    let account = setup.synchronizer.refresh_account().await.unwrap();
    assert_eq!(account, Some(ALICE));
    assert_eq!(setup.synchronizer.session().active_account, Some(ALICE));
    assert_eq!(setup.surface.text("account").unwrap(), ALICE.to_string());

    setup.provider.set_accounts(vec![BOB]);
    setup.synchronizer.refresh_account().await.unwrap();
    assert_eq!(setup.surface.text("account").unwrap(), BOB.to_string());
}

#[tokio::test]
async fn test_denied_provider_blocks_actions() {
    let setup = TestSetup::new(Auction);
    setup.provider.deny();
    setup.transport.set_uint("highestBid", U256::ZERO);

    assert_eq!(setup.synchronizer.refresh_account().await.unwrap(), None);
    assert_eq!(setup.synchronizer.session().active_account, None);
    assert_eq!(setup.surface.text("account").unwrap(), "");

    let result = setup
        .synchronizer
        .submit_action(AuctionAction::Bid {
            name: "Alice".into(),
            value: U256::from(FINNEY_5),
        })
        .await;
    assert_matches!(result, Err(Error::NoActiveAccount));
    assert!(setup.transport.sent().is_empty());
    assert!(setup.transport.calls().is_empty());
}

#[tokio::test]
async fn test_bid_must_exceed_highest_bid_by_increment() {
    let setup = auction_with_bids(0);

    let outcome = setup
        .synchronizer
        .submit_action(AuctionAction::Bid {
            name: "Alice".into(),
            value: U256::from(FINNEY_5 + 99),
        })
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Rejected(BID_TOO_LOW));
    assert_eq!(setup.surface.alerts(), [BID_TOO_LOW]);
    assert!(setup.transport.sent().is_empty());

    let outcome = setup
        .synchronizer
        .submit_action(AuctionAction::Bid {
            name: "Alice".into(),
            value: U256::from(FINNEY_5 + 100),
        })
        .await
        .unwrap();
    assert!(outcome.is_submitted());
    assert_eq!(
        setup.transport.sent(),
        [PendingAction {
            call: ContractCall::new("bid", vec![Token::from("Alice")]),
            parameters: TransactionParameters {
                from: ALICE,
                gas_price: DEFAULT_GAS_PRICE,
                value: Some(U256::from(FINNEY_5 + 100)),
            },
        }]
    );
    assert_eq!(setup.surface.alerts().len(), 1);
}

#[tokio::test]
async fn test_claim_only_after_auction_end() {
    let setup = auction_with_bids(0);
    setup.transport.set_uint("auctionEnd", U256::from(NOW + 1));

    let outcome = setup
        .synchronizer
        .submit_action(AuctionAction::Claim)
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Rejected(AUCTION_NOT_OVER));

    // No time left is not enough: the remaining time must be negative.
    setup.clock.add(Duration::from_secs(1));
    let outcome = setup
        .synchronizer
        .submit_action(AuctionAction::Claim)
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Rejected(AUCTION_NOT_OVER));
    assert!(setup.transport.sent().is_empty());

    setup.clock.add(Duration::from_secs(1));
    let outcome = setup
        .synchronizer
        .submit_action(AuctionAction::Claim)
        .await
        .unwrap();
    assert!(outcome.is_submitted());
    let sent = setup.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].call, ContractCall::getter("endAuction"));
    assert_eq!(sent[0].parameters.value, None);
}

#[tokio::test]
async fn test_withdraw_requires_pending_returns() {
    let setup = auction_with_bids(0);
    let pending_returns = ContractCall::new("pendingReturns", vec![Token::Address(ALICE)]);
    setup
        .transport
        .set_outputs(pending_returns.clone(), vec![Token::from(0u64)]);

    let outcome = setup
        .synchronizer
        .submit_action(AuctionAction::Withdraw)
        .await
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Rejected(NOTHING_TO_WITHDRAW));
    assert_eq!(setup.surface.alerts(), [NOTHING_TO_WITHDRAW]);

    setup
        .transport
        .set_outputs(pending_returns, vec![Token::from(7u64)]);
    let outcome = setup
        .synchronizer
        .submit_action(AuctionAction::Withdraw)
        .await
        .unwrap();
    assert!(outcome.is_submitted());
    let sent = setup.transport.sent();
    assert_eq!(sent[0].call, ContractCall::getter("withdraw"));
    assert_eq!(sent[0].parameters.from, ALICE);
}

#[tokio::test]
async fn test_withdraw_with_empty_pending_returns_is_an_error() {
    let setup = auction_with_bids(0);
    setup.transport.set_outputs(
        ContractCall::new("pendingReturns", vec![Token::Address(ALICE)]),
        vec![],
    );

    let result = setup.synchronizer.submit_action(AuctionAction::Withdraw).await;
    assert_matches!(
        result,
        Err(Error::UnexpectedOutput { function, .. }) if function == "pendingReturns"
    );
    assert!(setup.surface.alerts().is_empty());
    assert!(setup.transport.sent().is_empty());
}

#[tokio::test]
async fn test_sign_pays_bounty_plus_offset() {
    let setup = guestbook_with_entries();
    let outcome = setup
        .synchronizer
        .submit_action(GuestbookAction::Sign {
            name: "Bob".into(),
            email: "bob@example.com".into(),
            message: "Nice contract".into(),
        })
        .await
        .unwrap();
    assert!(outcome.is_submitted());
    assert_eq!(
        setup.transport.sent(),
        [PendingAction {
            call: ContractCall::new(
                "sign",
                vec![
                    Token::from("Bob"),
                    Token::from("bob@example.com"),
                    Token::from("Nice contract"),
                ],
            ),
            parameters: TransactionParameters {
                from: ALICE,
                gas_price: DEFAULT_GAS_PRICE,
                value: Some(U256::from(1010)),
            },
        }]
    );
}

#[tokio::test]
async fn test_cash_out_has_no_local_guard() {
    let setup = guestbook_with_entries();
    let outcome = setup
        .synchronizer
        .submit_action(GuestbookAction::CashOut)
        .await
        .unwrap();
    assert!(outcome.is_submitted());
    assert!(setup.transport.calls().is_empty());
    let sent = setup.transport.sent();
    assert_eq!(sent[0].call, ContractCall::getter("cashOut"));
    assert_eq!(sent[0].parameters.value, None);
}

#[tokio::test]
async fn test_failed_transaction_is_reported() {
    let setup = guestbook_with_entries();
    setup.transport.fail_sends(true);
    let result = setup
        .synchronizer
        .submit_action(GuestbookAction::CashOut)
        .await;
    assert_matches!(result, Err(Error::Transport(_)));
    assert!(setup.surface.alerts().is_empty());
}

#[tokio::test]
async fn test_auction_entries_newest_first() {
    let setup = auction_with_bids(10);
    let entries = setup.synchronizer.refresh_entries().await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].texts, ["bidder0"]);
    assert_eq!(
        setup.entry_headlines(),
        [
            "Name: bidder3",
            "Name: bidder2",
            "Name: bidder1",
            "Name: bidder0"
        ]
    );
}

#[tokio::test]
async fn test_guestbook_entries_in_order() {
    let setup = guestbook_with_entries();
    setup.synchronizer.refresh_entries().await.unwrap();
    assert_eq!(
        setup.entry_headlines(),
        [
            "guest0 <guest@example.com>",
            "guest1 <guest@example.com>",
            "guest2 <guest@example.com>"
        ]
    );
    let first = setup.surface.children("entries").unwrap()[0].to_string();
    assert_eq!(
        first,
        format!(
            "guest0 <guest@example.com>\n{BOB}\nsigned on Thu, 01 Jan 1970 00:00:00 GMT for 10 Wei\nHello"
        )
    );
}

#[tokio::test]
async fn test_refresh_entries_is_idempotent() {
    let setup = auction_with_bids(4);
    setup.synchronizer.refresh_entries().await.unwrap();
    let first = setup.surface.children("entries").unwrap();
    setup.synchronizer.refresh_entries().await.unwrap();
    assert_eq!(setup.surface.children("entries").unwrap(), first);
    assert_eq!(first.len(), 4);
}

#[tokio::test]
async fn test_entries_limited_by_total_bids() {
    let setup = auction_with_bids(2);
    setup.synchronizer.refresh_entries().await.unwrap();
    assert_eq!(setup.entry_headlines(), ["Name: bidder1", "Name: bidder0"]);
    assert_eq!(
        setup.transport.calls(),
        [
            ContractCall::getter("totalBids"),
            ContractCall::new("entries", vec![Token::from(0u64)]),
            ContractCall::new("entries", vec![Token::from(1u64)]),
        ]
    );

    let setup = auction_with_bids(0);
    setup.synchronizer.refresh_entries().await.unwrap();
    assert!(setup.entry_headlines().is_empty());
}

#[tokio::test]
async fn test_entry_count_from_config() {
    let config = SynchronizerConfig {
        entry_count: Some(2),
        ..SynchronizerConfig::default()
    };
    let setup = TestSetup::with_config(Guestbook, config);
    for index in 0..2 {
        setup
            .transport
            .set_entry("gb", index, guestbook_entry(BOB, "b", "e", "m", 0, 0));
    }
    let entries = setup.synchronizer.refresh_entries().await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_failed_entry_read_keeps_display() {
    let setup = auction_with_bids(4);
    setup.synchronizer.refresh_entries().await.unwrap();
    let before = setup.surface.children("entries").unwrap();

    setup
        .transport
        .set_entry("entries", 2, vec![Token::from("truncated")]);
    let result = setup.synchronizer.refresh_entries().await;
    assert_matches!(result, Err(Error::UnexpectedOutput { .. }));
    assert_eq!(setup.surface.children("entries").unwrap(), before);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let context = SyncContext {
        provider: Arc::new(MockProvider::denying()),
        transport: Arc::new(MockTransport::new(CONTRACT)),
        surface: Arc::new(MemorySurface::default()),
        clock: Arc::new(TestClock::at_secs(NOW)),
    };
    let config = SynchronizerConfig {
        gas_price: 0,
        ..SynchronizerConfig::default()
    };
    assert!(matches!(
        Synchronizer::new(context, Auction, &config),
        Err(Error::Config(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_event_updates_value_then_entries_then_countdown() {
    let setup = auction_with_bids(4);
    setup
        .synchronizer
        .handle_event(value_event("NewEntry", 500))
        .await
        .unwrap();

    // The displayed value comes from the event, not from a new read.
    assert_eq!(setup.surface.text("highestBid").unwrap(), "500 Wei");
    let calls = setup.transport.calls();
    assert_eq!(calls.first(), Some(&ContractCall::getter("totalBids")));
    assert_eq!(calls.last(), Some(&ContractCall::getter("auctionEnd")));
    assert!(!calls.contains(&ContractCall::getter("highestBid")));
    assert_eq!(setup.entry_headlines().len(), 4);

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(setup.surface.text("remaining").unwrap(), "02:05");
}

#[tokio::test(start_paused = true)]
async fn test_event_restarts_countdown_after_failed_entry_read() {
    let setup = TestSetup::new(Auction);
    setup.transport.set_uint("totalBids", U256::from(2));
    setup.transport.set_uint("auctionEnd", U256::from(NOW + 125));

    let result = setup
        .synchronizer
        .handle_event(value_event("NewEntry", 500))
        .await;
    assert_matches!(result, Err(Error::Transport(_)));
    assert_eq!(setup.surface.text("highestBid").unwrap(), "500 Wei");
    assert_eq!(
        setup.transport.calls().last(),
        Some(&ContractCall::getter("auctionEnd"))
    );

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(setup.surface.text("remaining").unwrap(), "02:05");
}

#[tokio::test]
async fn test_foreign_and_malformed_events() {
    let setup = auction_with_bids(4);
    setup
        .synchronizer
        .handle_event(value_event("Entry", 1))
        .await
        .unwrap();
    assert!(setup.transport.calls().is_empty());
    assert_eq!(setup.surface.text("highestBid").unwrap(), "");

    let event = ContractEvent {
        name: "NewEntry".into(),
        values: vec![Token::from("oops")],
        block_number: Some(7),
    };
    assert_matches!(
        setup.synchronizer.handle_event(event).await,
        Err(Error::MalformedEvent { .. })
    );
}

#[tokio::test(start_paused = true)]
async fn test_restarted_countdown_replaces_previous_one() {
    let setup = auction_with_bids(4);
    setup.synchronizer.refresh_countdown().await.unwrap();

    sleep(Duration::from_millis(500)).await;
    setup
        .transport
        .set_uint("auctionEnd", U256::from(NOW + 65));
    setup.synchronizer.refresh_countdown().await.unwrap();

    // The first countdown would have ticked at 1s and 2s, the new one ticks at 1.5s.
    sleep(Duration::from_millis(1700)).await;
    assert_eq!(setup.surface.text("remaining").unwrap(), "01:05");

    setup.synchronizer.shutdown();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(setup.surface.text("remaining").unwrap(), "01:05");
}

#[tokio::test(start_paused = true)]
async fn test_past_deadline_shows_over_message() {
    let setup = auction_with_bids(4);
    setup
        .transport
        .set_uint("auctionEnd", U256::from(NOW - 10));
    setup.synchronizer.refresh_countdown().await.unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(setup.surface.text("remaining").unwrap(), BIDDING_OVER);
}

#[tokio::test]
async fn test_guestbook_has_no_countdown() {
    let setup = guestbook_with_entries();
    setup.synchronizer.refresh_countdown().await.unwrap();
    assert!(setup.transport.calls().is_empty());
    assert_eq!(
        setup.synchronizer.integration().elements(),
        ["account", "bounty", "entries"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_refresh_all() {
    let setup = auction_with_bids(1);
    setup.synchronizer.refresh_all().await.unwrap();
    assert_eq!(setup.surface.text("account").unwrap(), ALICE.to_string());
    assert_eq!(setup.surface.text("highestBid").unwrap(), "100 Wei");
    assert_eq!(setup.entry_headlines(), ["Name: bidder0"]);
    setup.synchronizer.shutdown();
}

#[tokio::test]
async fn test_read_snapshot() {
    let setup = guestbook_with_entries();
    setup
        .transport
        .set_outputs(ContractCall::getter("owner"), vec![Token::Address(BOB)]);
    let snapshot = setup.synchronizer.read_snapshot().await.unwrap();
    assert_eq!(snapshot.get("bounty"), Some(&Token::from(1000u64)));
    assert_eq!(snapshot.get("owner"), Some(&Token::Address(BOB)));
    assert_eq!(snapshot.get("ended"), None);
    assert_eq!(snapshot.to_string(), format!("bounty: 1000\nowner: {BOB}"));

    // A missing getter fails the whole read.
    let setup = auction_with_bids(1);
    assert_matches!(
        setup.synchronizer.read_snapshot().await,
        Err(Error::Transport(_))
    );
}
