use crate::model::constants::{
    DUPLICATE_WINDOW_MINUTES, K_FACTOR_BASE, K_FACTOR_FLOOR, RECENCY_DECAY_FACTOR, RECENCY_HORIZON,
    SCORE_DIFF_MULTIPLIER
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunables for the rating formula. The defaults in `constants` describe the
/// club's production configuration; tests and simulations may override them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Maximum per-match rating swing for a player below the recency horizon
    pub k_base: f64,
    /// Lower clamp for the decayed K-factor
    pub k_floor: f64,
    /// Prior-match count below which the full K-factor applies
    pub recency_horizon: u32,
    /// Geometric decay applied once per match beyond the horizon
    pub recency_decay: f64,
    /// Weight of the score differential in the margin scale
    pub margin_multiplier: f64
}

impl Default for RatingConfig {
    fn default() -> Self {
        RatingConfig {
            k_base: K_FACTOR_BASE,
            k_floor: K_FACTOR_FLOOR,
            recency_horizon: RECENCY_HORIZON,
            recency_decay: RECENCY_DECAY_FACTOR,
            margin_multiplier: SCORE_DIFF_MULTIPLIER
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub rating: RatingConfig,
    pub duplicate_window_minutes: i64
}

impl EngineConfig {
    pub fn duplicate_window(&self) -> Duration {
        Duration::minutes(self.duplicate_window_minutes)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rating: RatingConfig::default(),
            duplicate_window_minutes: DUPLICATE_WINDOW_MINUTES
        }
    }
}
