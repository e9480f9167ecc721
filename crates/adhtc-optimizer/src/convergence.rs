//! Convergence diagnostics over a fitness history.

use serde::{Deserialize, Serialize};

/// Number of trailing history entries inspected.
pub const CONVERGENCE_WINDOW: usize = 10;
/// Variance below which the trailing window counts as settled.
pub const CONVERGENCE_VARIANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub converged: bool,
    /// `1 / (1 + variance)` of the trailing window, 0 for short histories.
    pub stability: f64,
    /// Relative change from the first to the last history entry.
    pub final_improvement: f64,
}

impl ConvergenceReport {
    pub fn from_history(history: &[f64]) -> Self {
        if history.len() < CONVERGENCE_WINDOW {
            return Self::default();
        }

        let recent = &history[history.len() - CONVERGENCE_WINDOW..];
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        let variance = recent.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / recent.len() as f64;

        let first = history[0];
        let last = history[history.len() - 1];
        let final_improvement = if first == 0.0 {
            0.0
        } else {
            (last - first) / first.abs()
        };

        Self {
            converged: variance < CONVERGENCE_VARIANCE,
            stability: 1.0 / (1.0 + variance),
            final_improvement,
        }
    }
}
