//! Fixed-window rate limiter for the external chain source.
//!
//! Exactly one limiter exists per process, owned by the shared query
//! cache; callers never reach the source around it. When the window budget
//! is exhausted the call fails with [`ChainError::RateLimited`] instead of
//! queueing: the core never retries on its own.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::ChainError;

pub struct RateLimiter {
    /// Requests allowed per window
    budget: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    used: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(budget: u32, window: Duration) -> Self {
        Self {
            budget,
            window,
            state: Mutex::new(WindowState {
                used: 0,
                window_start: Instant::now(),
            }),
        }
    }

    /// Spend one slot of the current window
    pub fn try_acquire(&self) -> Result<(), ChainError> {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();

        if now.duration_since(state.window_start) >= self.window {
            state.used = 0;
            state.window_start = now;
        }

        if state.used >= self.budget {
            return Err(ChainError::RateLimited);
        }

        state.used += 1;
        Ok(())
    }

    /// Slots left in the current window
    pub fn remaining(&self) -> u32 {
        let state = self.state.lock().unwrap();
        if state.window_start.elapsed() >= self.window {
            return self.budget;
        }
        self.budget.saturating_sub(state.used)
    }
}
