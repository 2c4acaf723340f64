//! # Cardex Season Simulator
//!
//! Plays one scripted season against the in-memory economy and prints what
//! happened.
//!
//! ## Usage
//!
//! ```bash
//! cardex_sim --season data/season.toml --players 16
//! RUST_LOG=cardex_economy=debug cardex_sim
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use alloy_primitives::U256;
use cardex::{run_season, SeasonConfig, SeasonReport};
use cardex_shared::WAD;
use tracing_subscriber::EnvFilter;

const DEFAULT_SEASON: &str = "data/season.toml";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command line arguments (simple parsing, no external deps)
    let args: Vec<String> = std::env::args().collect();
    let mut season_path = PathBuf::from(DEFAULT_SEASON);
    let mut players: Option<u32> = None;
    let mut seed: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--season" | "-s" => {
                if i + 1 < args.len() {
                    season_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--players" | "-p" => {
                if i + 1 < args.len() {
                    players = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: cardex_sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --season <FILE>     Season file (default: {DEFAULT_SEASON})");
                println!("  -p, --players <N>       Override the number of players");
                println!("      --seed <SEED>       Override the season seed");
                println!("  -h, --help              Show this help");
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                return ExitCode::FAILURE;
            }
        }
        i += 1;
    }

    let mut config = if season_path.exists() {
        match SeasonConfig::from_file(&season_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!("{}", err);
                return ExitCode::FAILURE;
            }
        }
    } else {
        tracing::warn!("{} not found, using the default season", season_path.display());
        SeasonConfig::default()
    };
    if let Some(players) = players {
        config.simulation.players = players;
    }
    if let Some(seed) = seed {
        config.simulation.seed = seed;
    }

    let started = Instant::now();
    match run_season(&config) {
        Ok(report) => {
            print_report(&report);
            println!("Season played in {:.2?}", started.elapsed());
            if report.consistent {
                ExitCode::SUCCESS
            } else {
                tracing::error!("Offer views disagree with the offered flags");
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            tracing::error!("Season aborted: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &SeasonReport) {
    println!();
    println!("═══ SEASON REPORT ═══");
    println!("Players:          {}", report.players);
    println!("Packs bought:     {}", report.packs_bought);
    println!("Packs opened:     {}", report.packs_opened);
    println!("Cards minted:     {}", report.cards_minted);
    println!("Offers created:   {}", report.offers_created);
    println!("Exchanges:        {}", report.exchanges);
    println!("Offers left:      {}", report.offers_left);
    println!("Cards burned:     {}", report.cards_burned);
    println!("Tickets issued:   {}", report.tickets_issued);
    println!("Albums completed: {}", report.albums_completed);
    println!("Skipped prizes:   {}", report.skipped_prizes);
    println!("Prizes paid:      {} tokens", tokens(report.prizes_paid));
    println!("Prize pool left:  {} tokens", tokens(report.prize_pool_left));
    println!("Ledger events:    {}", report.events);
    println!("Consistent:       {}", report.consistent);
}

/// Formats a wad amount with four decimals.
fn tokens(amount: U256) -> String {
    let wad = U256::from(WAD);
    let whole = amount / wad;
    let fraction = u64::try_from((amount % wad) / U256::from(WAD / 10_000)).unwrap_or_default();
    format!("{whole}.{fraction:04}")
}
