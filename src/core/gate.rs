//! Concurrency gate: bounds how many tasks execute at once.

use crate::core::SchedulerError;

/// In-flight counter bounded to `[0, max_concurrency]`.
///
/// Every [`release`](Self::release) must pair with an earlier
/// [`acquire`](Self::acquire) for the same admission.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    max_concurrency: u32,
    in_flight: u32,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `max_concurrency` tasks at once.
    #[must_use]
    pub const fn new(max_concurrency: u32) -> Self {
        Self {
            max_concurrency,
            in_flight: 0,
        }
    }

    /// Whether another task may start.
    #[must_use]
    pub const fn has_headroom(&self) -> bool {
        self.in_flight < self.max_concurrency
    }

    /// Take a slot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ConcurrencyExhausted`] and leaves the gate
    /// unchanged when every slot is taken.
    pub fn acquire(&mut self) -> Result<(), SchedulerError> {
        if !self.has_headroom() {
            return Err(SchedulerError::ConcurrencyExhausted);
        }
        self.in_flight += 1;
        Ok(())
    }

    /// Give a slot back.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::GateUnderflow`] and leaves the gate unchanged
    /// when nothing is in flight.
    pub fn release(&mut self) -> Result<(), SchedulerError> {
        self.in_flight = self
            .in_flight
            .checked_sub(1)
            .ok_or(SchedulerError::GateUnderflow)?;
        Ok(())
    }

    /// Tasks currently holding a slot.
    #[must_use]
    pub const fn in_flight(&self) -> u32 {
        self.in_flight
    }

    /// Configured slot count.
    #[must_use]
    pub const fn max_concurrency(&self) -> u32 {
        self.max_concurrency
    }
}
