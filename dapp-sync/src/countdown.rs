// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A one-second ticking countdown rendered into a display element.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::display::DisplaySurface;

/// The period between two updates of the countdown.
pub const TICK: Duration = Duration::from_secs(1);

/// Formats a number of seconds as `MM:SS`, truncating both components toward zero.
pub fn format_remaining(seconds: f64) -> String {
    let minutes = (seconds / 60.0).trunc() as i64;
    let seconds = (seconds % 60.0).trunc() as i64;
    format!("{minutes:02}:{seconds:02}")
}

/// A running countdown. The ticking task stops by itself once the terminal message is
/// shown, and is cancelled when the handle is stopped or dropped.
#[derive(Debug)]
pub struct Countdown {
    cancellation_token: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl Countdown {
    /// Starts ticking from `remaining` seconds. The first update happens one tick from
    /// now.
    pub fn start(
        remaining: f64,
        surface: Arc<dyn DisplaySurface>,
        element: impl Into<String>,
        over_message: impl Into<String>,
    ) -> Self {
        let cancellation_token = CancellationToken::new();
        let ticker = Ticker {
            remaining,
            surface,
            element: element.into(),
            over_message: over_message.into(),
        };
        let join_handle = tokio::spawn(ticker.run(cancellation_token.clone()));
        Countdown {
            cancellation_token,
            join_handle,
        }
    }

    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    /// Whether the ticking task has ended, either at the terminal state or after being
    /// stopped.
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

struct Ticker {
    remaining: f64,
    surface: Arc<dyn DisplaySurface>,
    element: String,
    over_message: String,
}

impl Ticker {
    async fn run(mut self, cancellation_token: CancellationToken) {
        let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
        loop {
            tokio::select! {
                () = cancellation_token.cancelled() => {
                    debug!(element = %self.element, "countdown cancelled");
                    return;
                }
                _ = interval.tick() => {}
            }
            if self.remaining >= 0.0 {
                let text = format_remaining(self.remaining);
                if let Err(error) = self.surface.replace_text(&self.element, &text) {
                    warn!(%error, "countdown stopped");
                    return;
                }
            }
            self.remaining -= 1.0;
            if self.remaining < 0.0 {
                if let Err(error) = self.surface.replace_text(&self.element, &self.over_message)
                {
                    warn!(%error, "failed to show the end of the countdown");
                }
                debug!(element = %self.element, "countdown over");
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "unit_tests/countdown_tests.rs"]
mod tests;
