//! ParameterCombination — one point in the lookback × holding grid.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InvalidInputError;

/// Lookback window and holding period for one backtest.
///
/// Ordering is lexicographic (lookback, then holding), which the grid search
/// uses as its final deterministic tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterCombination {
    pub lookback_window: usize,
    pub holding_period: usize,
}

impl ParameterCombination {
    pub fn new(lookback_window: usize, holding_period: usize) -> Result<Self, InvalidInputError> {
        if lookback_window == 0 || holding_period == 0 {
            return Err(InvalidInputError::ZeroWindow {
                lookback: lookback_window,
                holding: holding_period,
            });
        }
        Ok(Self {
            lookback_window,
            holding_period,
        })
    }

    /// Stable run label, e.g. `win20_hold10`.
    pub fn label(&self) -> String {
        format!("win{}_hold{}", self.lookback_window, self.holding_period)
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lookback={} holding={}",
            self.lookback_window, self.holding_period
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_windows() {
        assert!(ParameterCombination::new(0, 5).is_err());
        assert!(ParameterCombination::new(5, 0).is_err());
        assert!(ParameterCombination::new(1, 1).is_ok());
    }

    #[test]
    fn ordering_is_lookback_first() {
        let a = ParameterCombination::new(10, 20).unwrap();
        let b = ParameterCombination::new(20, 5).unwrap();
        assert!(a < b);
    }

    #[test]
    fn label_and_display() {
        let p = ParameterCombination::new(20, 10).unwrap();
        assert_eq!(p.label(), "win20_hold10");
        assert_eq!(p.to_string(), "lookback=20 holding=10");
    }
}
