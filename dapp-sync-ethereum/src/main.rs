// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A command-line runner keeping a log-based display in sync with a contract.

use std::{io::IsTerminal as _, sync::Arc};

use alloy::primitives::{Address, U256};
use anyhow::bail;
use clap::{Parser, Subcommand};
use dapp_sync::{
    data_types::ActionOutcome,
    display::{MemorySurface, TracingSurface},
    integration::{Auction, AuctionAction, Guestbook, GuestbookAction, Integration},
    time::SystemClock,
    SyncContext, Synchronizer, SynchronizerConfig, SynchronizerHandle,
};
use dapp_sync_ethereum::{
    abi::{AUCTION_ADDRESS, GUESTBOOK_ADDRESS},
    ContractAbi, EthereumClient, EthereumTransport, EthereumTransportConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(Parser)]
#[command(
    name = "dapp-sync",
    version,
    about = "Follows a contract's state and submits actions to it"
)]
struct Options {
    #[command(subcommand)]
    contract: ContractCommand,
}

#[derive(Subcommand)]
enum ContractCommand {
    /// The auction contract.
    Auction {
        #[command(flatten)]
        connection: ConnectionOptions,
        #[command(subcommand)]
        command: AuctionCommand,
    },
    /// The guestbook contract.
    Guestbook {
        #[command(flatten)]
        connection: ConnectionOptions,
        #[command(subcommand)]
        command: GuestbookCommand,
    },
}

#[derive(clap::Args)]
struct ConnectionOptions {
    /// The JSON-RPC endpoint of an Ethereum node managing the user's accounts.
    #[arg(
        long = "rpc-url",
        env = "DAPP_SYNC_RPC_URL",
        default_value = "http://localhost:8545"
    )]
    rpc_url: String,

    /// The address of the contract, if not the known deployment.
    #[arg(long = "contract", env = "DAPP_SYNC_CONTRACT")]
    contract: Option<Address>,

    #[command(flatten)]
    synchronizer: SynchronizerConfig,

    #[command(flatten)]
    transport: EthereumTransportConfig,
}

#[derive(Subcommand)]
enum AuctionCommand {
    /// Renders the auction and follows it until interrupted.
    Watch,
    /// Prints the auction's current values.
    Status,
    /// Places a bid.
    Bid {
        #[arg(long)]
        name: String,
        /// The amount of the bid, in wei.
        #[arg(long)]
        value: U256,
    },
    /// Ends the auction once bidding is over.
    Claim,
    /// Recovers the funds of outbid bids.
    Withdraw,
}

#[derive(Subcommand)]
enum GuestbookCommand {
    /// Renders the guestbook and follows it until interrupted.
    Watch,
    /// Prints the guestbook's current values.
    Status,
    /// Signs the guestbook, paying the current bounty plus 10 wei.
    Sign {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        message: String,
    },
    /// Collects the contract's balance. Only the owner may do this.
    CashOut,
}

enum Command<A> {
    Watch,
    Status,
    Act(A),
}

impl From<AuctionCommand> for Command<AuctionAction> {
    fn from(command: AuctionCommand) -> Self {
        match command {
            AuctionCommand::Watch => Command::Watch,
            AuctionCommand::Status => Command::Status,
            AuctionCommand::Bid { name, value } => Command::Act(AuctionAction::Bid { name, value }),
            AuctionCommand::Claim => Command::Act(AuctionAction::Claim),
            AuctionCommand::Withdraw => Command::Act(AuctionAction::Withdraw),
        }
    }
}

impl From<GuestbookCommand> for Command<GuestbookAction> {
    fn from(command: GuestbookCommand) -> Self {
        match command {
            GuestbookCommand::Watch => Command::Watch,
            GuestbookCommand::Status => Command::Status,
            GuestbookCommand::Sign {
                name,
                email,
                message,
            } => Command::Act(GuestbookAction::Sign {
                name,
                email,
                message,
            }),
            GuestbookCommand::CashOut => Command::Act(GuestbookAction::CashOut),
        }
    }
}

async fn run<I: Integration>(
    integration: I,
    abi: ContractAbi,
    default_address: Address,
    connection: ConnectionOptions,
    command: Command<I::Action>,
) -> anyhow::Result<()> {
    let client = Arc::new(EthereumClient::new(&connection.rpc_url)?);
    let address = connection.contract.unwrap_or(default_address);
    let transport = EthereumTransport::new(client.clone(), abi, address, &connection.transport)?;
    let surface = TracingSurface::new(MemorySurface::with_elements(integration.elements()));
    let context = SyncContext {
        provider: client,
        transport: Arc::new(transport),
        surface: Arc::new(surface),
        clock: Arc::new(SystemClock),
    };
    let synchronizer = Synchronizer::new(context, integration, &connection.synchronizer)?;
    info!(%address, contract = synchronizer.integration().name(), "connected");

    match command {
        Command::Status => {
            let snapshot = synchronizer.read_snapshot().await?;
            println!("{snapshot}");
        }
        Command::Act(action) => match synchronizer.submit_action(action).await? {
            ActionOutcome::Submitted(hash) => println!("{hash}"),
            ActionOutcome::Rejected(message) => bail!(message),
        },
        Command::Watch => {
            // No actions come from the command line while watching; the handle keeps
            // the trigger channel open.
            let (_handle, triggers) = SynchronizerHandle::<I::Action>::new();
            let cancellation_token = CancellationToken::new();
            tokio::spawn({
                let cancellation_token = cancellation_token.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancellation_token.cancel();
                    }
                }
            });
            synchronizer.run(triggers, cancellation_token).await?;
        }
    }
    Ok(())
}

/// Logs to stderr, with the verbosity given by `RUST_LOG` (`info` by default).
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        .from_env_lossy();
    let color_output =
        !std::env::var("NO_COLOR").is_ok_and(|x| !x.is_empty()) && std::io::stderr().is_terminal();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(color_output),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let options = Options::parse();
    match options.contract {
        ContractCommand::Auction {
            connection,
            command,
        } => {
            run(
                Auction,
                ContractAbi::auction()?,
                AUCTION_ADDRESS,
                connection,
                command.into(),
            )
            .await
        }
        ContractCommand::Guestbook {
            connection,
            command,
        } => {
            run(
                Guestbook,
                ContractAbi::guestbook()?,
                GUESTBOOK_ADDRESS,
                connection,
                command.into(),
            )
            .await
        }
    }
}
