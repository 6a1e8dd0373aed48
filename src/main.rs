use std::{collections::HashMap, fs};

use bandits_engine::{
    args::Args,
    model::{
        constants::RECENT_MATCHES_LIMIT,
        db_structs::{MatchRecord, Player, PlayerId},
        export, statistics
    },
    store::{MatchStore, PlayerStore}
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_level))
        .init();

    let json = fs::read_to_string(&args.snapshot).expect("Expected a readable snapshot file");
    let store = export::from_json(&json).expect("Expected a valid snapshot export");

    let names: HashMap<PlayerId, String> = store
        .all_players()
        .expect("Expected players to be readable")
        .into_iter()
        .map(|p| (p.id, p.short_name().to_string()))
        .collect();

    let leaderboard =
        statistics::leaderboard(&store, None, args.top).expect("Expected leaderboard to be readable");

    println!("Leaderboard");
    for (rank, player) in leaderboard.iter().enumerate() {
        println!("{}", leaderboard_line(rank + 1, player));
    }

    let matches = store.all_matches().expect("Expected matches to be readable");

    println!("\nRecent matches");
    for m in matches.iter().take(RECENT_MATCHES_LIMIT) {
        println!("{}", match_line(m, &names));
    }
}

fn leaderboard_line(rank: usize, player: &Player) -> String {
    format!(
        "{:>3}. {:<24} {:>8.1}  {}",
        rank,
        player.display_name(),
        player.rating,
        player.skill_level
    )
}

fn match_line(m: &MatchRecord, names: &HashMap<PlayerId, String>) -> String {
    let side = |players: [PlayerId; 2]| {
        let resolve = |id: PlayerId| names.get(&id).cloned().unwrap_or_else(|| format!("#{}", id));
        format!("{} & {}", resolve(players[0]), resolve(players[1]))
    };

    format!(
        "{}  {} ({}) vs {} ({})",
        m.played_at.format("%Y-%m-%d %H:%M"),
        side(m.winning_team().players),
        m.winning_team().score,
        side(m.losing_team().players),
        m.losing_team().score
    )
}
