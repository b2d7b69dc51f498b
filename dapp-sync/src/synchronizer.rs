// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::SynchronizerConfig,
    countdown::Countdown,
    data_types::{
        ActionOutcome, Address, ContractCall, ContractEvent, ContractSnapshot, EntryRecord,
        PendingAction, Session, Token, TransactionParameters, U256,
    },
    display::DisplaySurface,
    integration::{
        EntrySource, GuardContext, Insertion, Integration, Plan, ScalarField, ACCOUNT_ELEMENT,
    },
    provider::AccountProvider,
    time::Clock,
    transport::{ContractTransport, ContractTransportExt as _},
    Error,
};

/// The collaborators a synchronizer works with.
#[derive(Clone)]
pub struct SyncContext {
    pub provider: Arc<dyn AccountProvider>,
    pub transport: Arc<dyn ContractTransport>,
    pub surface: Arc<dyn DisplaySurface>,
    pub clock: Arc<dyn Clock>,
}

/// A unit of work for [`Synchronizer::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger<A> {
    /// The user asked for an action.
    Action(A),
    /// The contract emitted an event.
    Event(ContractEvent),
}

/// The user-facing side of a running synchronizer: every click becomes a trigger.
pub struct SynchronizerHandle<A> {
    sender: UnboundedSender<Trigger<A>>,
}

impl<A> Clone for SynchronizerHandle<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A> SynchronizerHandle<A> {
    /// Creates a handle and the receiving end to pass to [`Synchronizer::run`].
    pub fn new() -> (Self, UnboundedReceiver<Trigger<A>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn submit(&self, action: A) -> Result<(), Error> {
        self.sender
            .send(Trigger::Action(action))
            .map_err(|_| Error::Stopped)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Keeps a display surface consistent with a contract and mediates user actions.
pub struct Synchronizer<I: Integration> {
    context: SyncContext,
    integration: I,
    entry_count: usize,
    gas_price: u128,
    session: Mutex<Session>,
    countdown: Mutex<Option<Countdown>>,
}

impl<I: Integration> Synchronizer<I> {
    pub fn new(
        context: SyncContext,
        integration: I,
        config: &SynchronizerConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        let entry_count = config.entry_count_or(integration.entries().default_count);
        Ok(Self {
            context,
            integration,
            entry_count,
            gas_price: config.gas_price,
            session: Mutex::default(),
            countdown: Mutex::default(),
        })
    }

    pub fn integration(&self) -> &I {
        &self.integration
    }

    pub fn session(&self) -> Session {
        lock(&self.session).clone()
    }

    /// Asks the provider for the active account and displays it.
    ///
    /// If the provider refuses, the session is left as it was and `None` is returned: the
    /// provider already told the user about it.
    pub async fn refresh_account(&self) -> Result<Option<Address>, Error> {
        let accounts = match self.context.provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(error) => {
                warn!(%error, "access to the wallet was not granted");
                return Ok(None);
            }
        };
        let Some(account) = accounts.first().copied() else {
            warn!("the wallet did not return any account");
            return Ok(None);
        };
        lock(&self.session).active_account = Some(account);
        self.context
            .surface
            .replace_text(ACCOUNT_ELEMENT, &account.to_string())?;
        Ok(Some(account))
    }

    /// Reads a value from the contract and displays it.
    ///
    /// Concurrent refreshes of the same field are not sequenced: the last read to complete
    /// is the one displayed.
    pub async fn refresh_scalar(&self, field: ScalarField) -> Result<U256, Error> {
        let value = self.context.transport.read_uint(&field.call()).await?;
        self.render_scalar(field, value)?;
        debug!(field = field.function, %value, "scalar refreshed");
        Ok(value)
    }

    fn render_scalar(&self, field: ScalarField, value: U256) -> Result<(), Error> {
        self.context
            .surface
            .replace_text(field.element, &ScalarField::render(value))
    }

    /// Reads the entries from the contract and re-renders all of them.
    pub async fn refresh_entries(&self) -> Result<Vec<EntryRecord>, Error> {
        let source = self.integration.entries();
        let count = self.entries_to_read(&source).await?;
        let entries = future::try_join_all((0..count).map(|index| async move {
            let outputs = self.context.transport.call(&source.call(index)).await?;
            self.integration.parse_entry(outputs)
        }))
        .await?;

        let surface = &self.context.surface;
        surface.clear(source.element)?;
        for entry in &entries {
            let node = self.integration.render_entry(entry);
            match source.insertion {
                Insertion::Prepend => surface.prepend_child(source.element, node)?,
                Insertion::Append => surface.append_child(source.element, node)?,
            }
        }
        debug!(count, "entries refreshed");
        Ok(entries)
    }

    /// The configured entry count, capped by the contract's own total if it reports one.
    async fn entries_to_read(&self, source: &EntrySource) -> Result<usize, Error> {
        let Some(total_function) = source.total_function else {
            return Ok(self.entry_count);
        };
        let total = self
            .context
            .transport
            .read_uint(&ContractCall::getter(total_function))
            .await?;
        let total = u64::try_from(total)
            .ok()
            .and_then(|total| usize::try_from(total).ok())
            .unwrap_or(usize::MAX);
        if total < self.entry_count {
            debug!(
                total,
                configured = self.entry_count,
                "the contract holds fewer entries than configured"
            );
        }
        Ok(self.entry_count.min(total))
    }

    /// Reads the deadline from the contract and (re)starts the countdown towards it. Does
    /// nothing if this page has no countdown.
    pub async fn refresh_countdown(&self) -> Result<(), Error> {
        let Some(source) = self.integration.countdown() else {
            return Ok(());
        };
        let deadline = self
            .context
            .transport
            .read_uint(&ContractCall::getter(source.function))
            .await?;
        let deadline = u64::try_from(deadline).unwrap_or(u64::MAX) as f64;
        let remaining = deadline - self.context.clock.now().as_secs_f64();

        let mut countdown = lock(&self.countdown);
        if let Some(previous) = countdown.take() {
            previous.stop();
        }
        *countdown = Some(Countdown::start(
            remaining,
            self.context.surface.clone(),
            source.element,
            source.over_message,
        ));
        debug!(remaining, "countdown started");
        Ok(())
    }

    /// Reads every status getter of the integration.
    pub async fn read_snapshot(&self) -> Result<ContractSnapshot, Error> {
        let mut values = Vec::new();
        for getter in self.integration.status_getters() {
            let value = self
                .context
                .transport
                .call_single(&ContractCall::getter(*getter))
                .await?;
            values.push(((*getter).to_owned(), value));
        }
        Ok(ContractSnapshot { values })
    }

    /// Renders everything: account, value, entries and countdown. Every part is refreshed
    /// even if another one fails; the first failure is returned.
    pub async fn refresh_all(&self) -> Result<(), Error> {
        let account = self.refresh_account().await.map(drop);
        let scalar = self.refresh_scalar(self.integration.scalar()).await.map(drop);
        let entries = self.refresh_entries().await.map(drop);
        let countdown = self.refresh_countdown().await;
        account.and(scalar).and(entries).and(countdown)
    }

    /// Checks an action locally and sends it if the check passes. If it does not, the user
    /// is alerted and nothing else happens.
    pub async fn submit_action(&self, action: I::Action) -> Result<ActionOutcome, Error> {
        let account = self
            .refresh_account()
            .await?
            .ok_or(Error::NoActiveAccount)?;
        debug!(?action, %account, "evaluating action");
        let guard_context = GuardContext {
            account,
            transport: &*self.context.transport,
            clock: &*self.context.clock,
        };
        match self.integration.plan(action, guard_context).await? {
            Plan::Reject(message) => {
                info!(message, "action rejected locally");
                self.context.surface.alert(message);
                Ok(ActionOutcome::Rejected(message))
            }
            Plan::Submit { call, value } => {
                let action = PendingAction {
                    call,
                    parameters: TransactionParameters {
                        from: account,
                        gas_price: self.gas_price,
                        value,
                    },
                };
                info!(call = %action.call, value = ?action.parameters.value, "sending transaction");
                let hash = self.context.transport.send(action).await?;
                info!(%hash, "transaction accepted");
                Ok(ActionOutcome::Submitted(hash))
            }
        }
    }

    /// Reacts to a contract event: displays the value it carries, then re-renders the
    /// entries and restarts the countdown. A failed step does not stop the next ones.
    pub async fn handle_event(&self, event: ContractEvent) -> Result<(), Error> {
        if event.name != self.integration.event_name() {
            warn!(name = %event.name, "ignoring unexpected event");
            return Ok(());
        }
        let value = event
            .values
            .first()
            .and_then(Token::as_uint)
            .ok_or_else(|| Error::MalformedEvent {
                event: event.name.clone(),
                expected: "a uint256 value",
            })?;
        debug!(block_number = ?event.block_number, %value, "new entry");
        let scalar = self.render_scalar(self.integration.scalar(), value);
        let entries = self.refresh_entries().await.map(drop);
        let countdown = self.refresh_countdown().await;
        scalar.and(entries).and(countdown)
    }

    pub async fn process(&self, trigger: Trigger<I::Action>) -> Result<(), Error> {
        match trigger {
            Trigger::Action(action) => {
                self.submit_action(action).await?;
            }
            Trigger::Event(event) => self.handle_event(event).await?,
        }
        Ok(())
    }

    /// Renders the page, then processes user actions and contract events one at a time
    /// until `triggers` is closed or the token is cancelled.
    ///
    /// Failures are logged and leave the display as it was.
    #[instrument(skip_all, fields(integration = self.integration.name()))]
    pub async fn run(
        &self,
        mut triggers: UnboundedReceiver<Trigger<I::Action>>,
        cancellation_token: CancellationToken,
    ) -> Result<(), Error> {
        let mut events = self
            .context
            .transport
            .subscribe(self.integration.event_name())?;
        if let Err(error) = self.refresh_all().await {
            error!(%error, "failed to render the initial state");
        }

        let mut events_open = true;
        loop {
            let trigger = tokio::select! {
                () = cancellation_token.cancelled() => break,
                trigger = triggers.recv() => match trigger {
                    Some(trigger) => trigger,
                    None => break,
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => Trigger::Event(event),
                    None => {
                        warn!("the event subscription ended");
                        events_open = false;
                        continue;
                    }
                },
            };
            if let Err(error) = self.process(trigger).await {
                error!(%error, "failed to process trigger");
            }
        }

        self.shutdown();
        info!("synchronizer stopped");
        Ok(())
    }

    /// Stops the countdown, if any.
    pub fn shutdown(&self) {
        if let Some(countdown) = lock(&self.countdown).take() {
            countdown.stop();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "unit_tests/synchronizer_tests.rs"]
mod tests;
