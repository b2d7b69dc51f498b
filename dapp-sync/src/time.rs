// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Wall-clock time, as seen by guards and countdowns.
 */

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The time elapsed since the Unix epoch.
    fn now(&self) -> Duration;
}

/// The system's real-time clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }
}

#[cfg(any(test, feature = "test"))]
pub use test_clock::TestClock;

#[cfg(any(test, feature = "test"))]
mod test_clock {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::Clock;

    /// A clock that only moves when told to.
    #[derive(Clone, Debug, Default)]
    pub struct TestClock(Arc<Mutex<Duration>>);

    impl TestClock {
        /// Creates a clock set to the given number of seconds after the Unix epoch.
        pub fn at_secs(seconds: u64) -> Self {
            TestClock(Arc::new(Mutex::new(Duration::from_secs(seconds))))
        }

        pub fn set(&self, now: Duration) {
            *self.0.lock().unwrap() = now;
        }

        pub fn add(&self, delta: Duration) {
            *self.0.lock().unwrap() += delta;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Duration {
            *self.0.lock().unwrap()
        }
    }
}
