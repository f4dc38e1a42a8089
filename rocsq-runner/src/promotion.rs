//! Promotion rule: should a grid-search winner replace the production parameters?
//!
//! The rule is always supplied by the caller. Nothing here promotes by default;
//! a search without a rule reports its winner and stops.

use serde::{Deserialize, Serialize};

use rocsq_core::ParameterCombination;

use crate::config::ConfigError;
use crate::result::RunResult;

/// Whether a return exactly at the threshold passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBound {
    /// `total_return > min_total_return`
    Exclusive,
    /// `total_return >= min_total_return`
    Inclusive,
}

/// Caller-supplied promotion policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionRule {
    /// Fractional total return, e.g. 0.20 for 20%.
    pub min_total_return: f64,
    pub bound: ThresholdBound,
    /// Also require beating the currently deployed result, when one is given.
    #[serde(default)]
    pub require_improvement: bool,
}

/// Outcome of evaluating a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PromotionDecision {
    Promote {
        parameters: ParameterCombination,
        total_return: f64,
    },
    Reject {
        reason: RejectReason,
    },
}

impl PromotionDecision {
    pub fn is_promote(&self) -> bool {
        matches!(self, PromotionDecision::Promote { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The search produced no result to promote.
    NoWinner,
    BelowThreshold { total_return: f64, threshold: f64 },
    NotBetterThanCurrent { candidate: f64, current: f64 },
}

impl PromotionRule {
    pub fn exclusive(min_total_return: f64) -> Self {
        Self {
            min_total_return,
            bound: ThresholdBound::Exclusive,
            require_improvement: false,
        }
    }

    pub fn inclusive(min_total_return: f64) -> Self {
        Self {
            min_total_return,
            bound: ThresholdBound::Inclusive,
            require_improvement: false,
        }
    }

    pub fn with_improvement_required(mut self, required: bool) -> Self {
        self.require_improvement = required;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_total_return.is_finite() {
            return Err(ConfigError::NonFinitePromotionThreshold(self.min_total_return));
        }
        Ok(())
    }

    fn passes(&self, total_return: f64) -> bool {
        match self.bound {
            ThresholdBound::Exclusive => total_return > self.min_total_return,
            ThresholdBound::Inclusive => total_return >= self.min_total_return,
        }
    }

    /// Decide whether `winner` should be promoted over `current`.
    pub fn evaluate(
        &self,
        winner: Option<&RunResult>,
        current: Option<&RunResult>,
    ) -> PromotionDecision {
        let Some(winner) = winner else {
            return PromotionDecision::Reject {
                reason: RejectReason::NoWinner,
            };
        };
        let total_return = winner.metrics.total_return;

        if !self.passes(total_return) {
            return PromotionDecision::Reject {
                reason: RejectReason::BelowThreshold {
                    total_return,
                    threshold: self.min_total_return,
                },
            };
        }

        if self.require_improvement {
            if let Some(current) = current {
                let current_return = current.metrics.total_return;
                if total_return <= current_return {
                    return PromotionDecision::Reject {
                        reason: RejectReason::NotBetterThanCurrent {
                            candidate: total_return,
                            current: current_return,
                        },
                    };
                }
            }
        }

        PromotionDecision::Promote {
            parameters: winner.parameters,
            total_return,
        }
    }
}
