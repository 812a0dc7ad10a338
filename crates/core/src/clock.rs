// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Protocol timestamps are UNIX seconds as `f64`. Filenames carry the same
//! value rendered with [`format_timestamp`] so that lexicographic descending
//! order on names equals timestamp descending order.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A clock that provides the current protocol time
pub trait Clock: Clone + Send + Sync {
    /// Current UNIX time in seconds
    fn epoch_secs(&self) -> f64;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Fake clock for testing with controllable time
#[derive(Debug, Clone)]
pub struct FakeClock {
    secs: Arc<Mutex<f64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at(1_000_000.0)
    }

    /// Start the clock at a specific epoch-seconds value
    pub fn at(secs: f64) -> Self {
        Self { secs: Arc::new(Mutex::new(secs)) }
    }

    /// Advance the clock by the given number of seconds
    pub fn advance(&self, secs: f64) {
        *self.secs.lock() += secs;
    }

    /// Set the clock to a specific epoch-seconds value
    pub fn set(&self, secs: f64) {
        *self.secs.lock() = secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn epoch_secs(&self) -> f64 {
        *self.secs.lock()
    }
}

/// Render a timestamp for use in object names.
///
/// Fixed six decimal places: for contemporary epochs the integer part has a
/// stable width, so name order equals timestamp order.
pub fn format_timestamp(secs: f64) -> String {
    format!("{secs:.6}")
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
