//! Caller-supplied time budget threaded through a whole check.
//!
//! A [`Deadline`] combines an optional absolute expiry with a cancellation flag
//! shared with every [`CancelHandle`] created from it. Blocking socket calls never
//! wait longer than [`CANCEL_POLL_INTERVAL`] at a time, so an explicit cancellation
//! is observed within that interval while expiry is observed exactly on time.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest a single blocking read or write waits before re-checking the deadline.
/// This is the documented slack for explicit cancellation.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Why a [`Deadline`] no longer grants time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Elapsed,
    Cancelled,
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elapsed => f.write_str("deadline elapsed"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Deadline {
    /// Expires `timeout` from now. A zero timeout is already expired.
    pub fn after(timeout: Duration) -> Self {
        Self::at(Instant::now() + timeout)
    }

    pub fn at(expires_at: Instant) -> Self {
        Self {
            expires_at: Some(expires_at),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// No expiry; only an explicit cancellation ends it.
    pub fn never() -> Self {
        Self {
            expires_at: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left, `None` when unbounded. Zero once expired or cancelled.
    pub fn remaining(&self) -> Option<Duration> {
        if self.is_cancelled() {
            return Some(Duration::ZERO);
        }
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.check().is_err()
    }

    pub fn check(&self) -> Result<(), Expiry> {
        if self.is_cancelled() {
            return Err(Expiry::Cancelled);
        }
        match self.expires_at {
            Some(at) if Instant::now() >= at => Err(Expiry::Elapsed),
            _ => Ok(()),
        }
    }

    /// Timeout for the next blocking socket call: the remaining budget capped at
    /// [`CANCEL_POLL_INTERVAL`]. Never zero.
    pub(crate) fn io_slice(&self) -> Result<Duration, Expiry> {
        self.check()?;
        match self.remaining() {
            None => Ok(CANCEL_POLL_INTERVAL),
            Some(left) if left.is_zero() => Err(Expiry::Elapsed),
            Some(left) => Ok(left.min(CANCEL_POLL_INTERVAL)),
        }
    }

    /// Remaining budget for an operation that cannot be sliced (TCP connect, DNS),
    /// falling back to `unbounded` when the deadline has no expiry.
    pub(crate) fn budget_or(&self, unbounded: Duration) -> Result<Duration, Expiry> {
        self.check()?;
        match self.remaining() {
            None => Ok(unbounded),
            Some(left) if left.is_zero() => Err(Expiry::Elapsed),
            Some(left) => Ok(left),
        }
    }
}

/// Cancels the [`Deadline`] it was created from. Cheap to clone and `Send + Sync`.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_expired() {
        let deadline = Deadline::after(Duration::ZERO);
        assert_eq!(deadline.check(), Err(Expiry::Elapsed));
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
        assert!(deadline.io_slice().is_err());
    }

    #[test]
    fn never_has_no_remaining_bound() {
        let deadline = Deadline::never();
        assert_eq!(deadline.remaining(), None);
        assert_eq!(deadline.io_slice(), Ok(CANCEL_POLL_INTERVAL));
        assert_eq!(
            deadline.budget_or(Duration::from_secs(3)),
            Ok(Duration::from_secs(3))
        );
    }

    #[test]
    fn io_slice_is_capped() {
        let deadline = Deadline::after(Duration::from_secs(10));
        let slice = deadline.io_slice().expect("not expired");
        assert!(slice <= CANCEL_POLL_INTERVAL);
        assert!(!slice.is_zero());
    }

    #[test]
    fn cancel_handle_cancels_clones() {
        let deadline = Deadline::after(Duration::from_secs(10));
        let clone = deadline.clone();
        let handle = deadline.cancel_handle();
        std::thread::spawn(move || handle.cancel())
            .join()
            .expect("cancel thread");
        assert!(deadline.is_cancelled());
        assert_eq!(clone.check(), Err(Expiry::Cancelled));
        assert_eq!(clone.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn budget_uses_remaining_time() {
        let deadline = Deadline::after(Duration::from_millis(500));
        let budget = deadline
            .budget_or(Duration::from_secs(60))
            .expect("not expired");
        assert!(budget <= Duration::from_millis(500));
    }
}
