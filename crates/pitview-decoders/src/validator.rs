//! Rolling-window packet size validation.
//!
//! Advisory only: a datagram whose size matches none of the selected
//! decoder's published sizes is still handed to the decoder, but the
//! mismatch is remembered for one second so callers can surface a
//! "wrong game selected?" indicator.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::warn;

const ERROR_WINDOW: Duration = Duration::from_millis(1000);

/// Tracks size mismatches observed over the last second.
pub struct PacketSizeValidator {
    errors: VecDeque<(Instant, usize)>,
}

impl PacketSizeValidator {
    pub fn new() -> Self {
        Self {
            errors: VecDeque::new(),
        }
    }

    /// Checks a datagram length against the accepted sizes, recording a
    /// mismatch. Returns whether the length was accepted.
    pub fn validate(&mut self, size: usize, accepted: &[usize]) -> bool {
        self.validate_at(size, accepted, Instant::now())
    }

    /// Drops mismatches that have aged out of the window.
    pub fn sweep(&mut self) {
        self.purge(Instant::now());
    }

    /// Whether any mismatch is live in the window.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    fn validate_at(&mut self, size: usize, accepted: &[usize], now: Instant) -> bool {
        let valid = accepted.contains(&size);
        if !valid {
            self.errors.push_back((now, size));
            self.purge(now);
            warn!(size, expected = ?accepted, "unexpected packet size");
        }
        valid
    }

    fn purge(&mut self, now: Instant) {
        while let Some((recorded, _)) = self.errors.front() {
            if now.saturating_duration_since(*recorded) < ERROR_WINDOW {
                break;
            }
            self.errors.pop_front();
        }
    }
}

impl Default for PacketSizeValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_size_leaves_no_error() {
        let mut validator = PacketSizeValidator::new();
        assert!(validator.validate(311, &[311, 331]));
        assert!(!validator.has_errors());
    }

    #[test]
    fn mismatch_is_recorded() {
        let mut validator = PacketSizeValidator::new();
        assert!(!validator.validate(324, &[311, 331]));
        assert!(validator.has_errors());
        assert_eq!(validator.error_count(), 1);
    }

    #[test]
    fn mismatches_age_out_after_one_second() {
        let mut validator = PacketSizeValidator::new();
        let start = Instant::now();
        assert!(!validator.validate_at(100, &[311], start));
        assert!(!validator.validate_at(200, &[311], start + Duration::from_millis(500)));
        assert_eq!(validator.error_count(), 2);

        // A later mismatch purges the first but keeps the second.
        assert!(!validator.validate_at(300, &[311], start + Duration::from_millis(1100)));
        assert_eq!(validator.error_count(), 2);

        validator.purge(start + Duration::from_millis(2200));
        assert!(!validator.has_errors());
    }

    #[test]
    fn empty_accepted_list_rejects_everything() {
        let mut validator = PacketSizeValidator::new();
        assert!(!validator.validate(311, &[]));
        assert!(validator.has_errors());
    }
}
