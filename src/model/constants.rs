// Rating system defaults
pub const DEFAULT_RATING: f64 = 1000.0;
pub const K_FACTOR_BASE: f64 = 32.0;
pub const K_FACTOR_FLOOR: f64 = 8.0;
pub const SCORE_DIFF_MULTIPLIER: f64 = 0.1;
pub const RECENCY_DECAY_FACTOR: f64 = 0.95;
pub const RECENCY_HORIZON: u32 = 10;

// Duplicate detection
pub const DUPLICATE_WINDOW_MINUTES: i64 = 30;

// How many times a commit is retried after a stale-rating conflict
// before the caller is asked to resubmit
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

// Presentation defaults
pub const RECENT_MATCHES_LIMIT: usize = 10;
pub const TOP_PLAYERS_LIMIT: usize = 5;
pub const RATING_TREND_THRESHOLD: f64 = 5.0;

// Snapshot format
pub const EXPORT_VERSION: &str = "1.0";
