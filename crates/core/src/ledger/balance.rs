//! Running balance tracking for ledger lines.

use super::error::LedgerError;

/// Walks ledger lines in order, tracking the balance after each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningBalance {
    current: i64,
}

impl RunningBalance {
    /// Starts from an empty wallet.
    #[must_use]
    pub const fn opening() -> Self {
        Self { current: 0 }
    }

    /// Starts from the `balance_after` of the latest stored line.
    #[must_use]
    pub const fn from_last(balance_after: i64) -> Self {
        Self {
            current: balance_after,
        }
    }

    /// Current balance.
    #[must_use]
    pub const fn current(&self) -> i64 {
        self.current
    }

    /// Advances by `points` and returns the new `balance_after`.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` if the balance leaves the `i64` range.
    pub fn next(&mut self, points: i64) -> Result<i64, LedgerError> {
        self.current = self.current.checked_add(points).ok_or(LedgerError::Overflow)?;
        Ok(self.current)
    }

    /// Advances by `points` and checks the line's stored `balance_after`.
    ///
    /// # Errors
    ///
    /// Returns `RunningBalanceMismatch` when the stored value disagrees.
    pub fn verify(&mut self, points: i64, recorded: i64) -> Result<(), LedgerError> {
        let expected = self.next(points)?;
        if expected == recorded {
            Ok(())
        } else {
            Err(LedgerError::RunningBalanceMismatch { expected, recorded })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_entry_starts_at_zero() {
        let mut running = RunningBalance::opening();
        assert_eq!(running.next(25).unwrap(), 25);
    }

    #[test]
    fn test_next_entry_builds_on_previous() {
        let mut running = RunningBalance::from_last(100);
        assert_eq!(running.next(-30).unwrap(), 70);
        assert_eq!(running.current(), 70);
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let mut running = RunningBalance::opening();
        running.verify(10, 10).unwrap();
        assert_eq!(
            running.verify(5, 16),
            Err(LedgerError::RunningBalanceMismatch {
                expected: 15,
                recorded: 16
            })
        );
    }
}
