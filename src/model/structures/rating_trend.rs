use crate::model::constants::RATING_TREND_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Coarse direction of a rating change, for history displays.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RatingTrend {
    Up,
    Down,
    Stable
}

impl RatingTrend {
    pub fn from_change(delta: f64) -> RatingTrend {
        RatingTrend::with_threshold(delta, RATING_TREND_THRESHOLD)
    }

    pub fn with_threshold(delta: f64, threshold: f64) -> RatingTrend {
        if delta > threshold {
            RatingTrend::Up
        } else if delta < -threshold {
            RatingTrend::Down
        } else {
            RatingTrend::Stable
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::structures::rating_trend::RatingTrend;

    #[test]
    fn test_from_change() {
        assert_eq!(RatingTrend::from_change(25.6), RatingTrend::Up);
        assert_eq!(RatingTrend::from_change(-25.6), RatingTrend::Down);
        assert_eq!(RatingTrend::from_change(3.0), RatingTrend::Stable);
        assert_eq!(RatingTrend::from_change(-3.0), RatingTrend::Stable);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(RatingTrend::from_change(5.0), RatingTrend::Stable);
        assert_eq!(RatingTrend::from_change(-5.0), RatingTrend::Stable);
    }

    #[test]
    fn test_custom_threshold() {
        assert_eq!(RatingTrend::with_threshold(1.0, 0.5), RatingTrend::Up);
        assert_eq!(RatingTrend::with_threshold(-1.0, 0.5), RatingTrend::Down);
    }
}
