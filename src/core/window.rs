//! Fixed-window admission counter.

use std::time::Duration;

use crate::core::SchedulerError;

/// Counts admissions in the current rate window.
///
/// The counter never exceeds `max_admissions` between resets. Resetting is
/// driven from outside (the scheduler's window timer) every `period`.
#[derive(Debug, Clone)]
pub struct WindowController {
    max_admissions: u32,
    period: Duration,
    admitted: u32,
    generation: u64,
}

impl WindowController {
    /// Create a controller allowing `max_admissions` per `period`.
    #[must_use]
    pub const fn new(max_admissions: u32, period: Duration) -> Self {
        Self {
            max_admissions,
            period,
            admitted: 0,
            generation: 0,
        }
    }

    /// Whether another admission fits in the current window.
    #[must_use]
    pub const fn has_headroom(&self) -> bool {
        self.admitted < self.max_admissions
    }

    /// Count one admission against the current window.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::WindowExhausted`] and leaves the counter
    /// unchanged when the window is already full.
    pub fn record_admission(&mut self) -> Result<(), SchedulerError> {
        if !self.has_headroom() {
            return Err(SchedulerError::WindowExhausted);
        }
        self.admitted += 1;
        Ok(())
    }

    /// Start a new window. Returns how many admissions the closed window saw.
    pub fn reset(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        std::mem::take(&mut self.admitted)
    }

    /// Admissions so far in the current window.
    #[must_use]
    pub const fn admitted(&self) -> u32 {
        self.admitted
    }

    /// Admissions still available in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.max_admissions.saturating_sub(self.admitted)
    }

    /// Number of resets since construction.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Window length.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Configured admissions per window.
    #[must_use]
    pub const fn max_admissions(&self) -> u32 {
        self.max_admissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_caps_admissions() {
        let mut window = WindowController::new(2, Duration::from_secs(1));
        assert!(window.has_headroom());
        window.record_admission().unwrap();
        window.record_admission().unwrap();

        assert!(!window.has_headroom());
        assert_eq!(window.remaining(), 0);
        assert_eq!(window.record_admission(), Err(SchedulerError::WindowExhausted));
        assert_eq!(window.admitted(), 2);
    }

    #[test]
    fn test_reset_opens_new_window() {
        let mut window = WindowController::new(1, Duration::from_millis(250));
        window.record_admission().unwrap();
        assert_eq!(window.generation(), 0);

        assert_eq!(window.reset(), 1);
        assert_eq!(window.generation(), 1);
        assert_eq!(window.admitted(), 0);
        assert!(window.has_headroom());
        assert_eq!(window.period(), Duration::from_millis(250));
        assert_eq!(window.max_admissions(), 1);
    }
}
