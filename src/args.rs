use clap::Parser;
use std::path::PathBuf;

use crate::model::constants::TOP_PLAYERS_LIMIT;

#[derive(Parser, Clone)]
#[command(
    display_name = "Bandits Engine",
    author = "Bandits Badminton Club",
    long_about = "Loads a club snapshot and prints the leaderboard and recent matches"
)]
pub struct Args {
    /// Path to a JSON snapshot produced by the export module
    #[arg(short, long, env = "BANDITS_SNAPSHOT", help = "Snapshot file to load")]
    pub snapshot: PathBuf,

    /// How many players the leaderboard shows
    #[arg(short, long, default_value_t = TOP_PLAYERS_LIMIT, help = "Leaderboard size")]
    pub top: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        env = "RUST_LOG",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"],
        help = "Sets the logging verbosity"
    )]
    pub log_level: String
}
