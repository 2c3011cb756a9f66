//! Arena Simulator CLI Tool
//!
//! Command-line tool that drives the ranked engine in-process against a JSON
//! data directory, so state carries over between invocations.
//!
//! Usage:
//!   cargo run --bin arena-sim -- --help
//!   cargo run --bin arena-sim -- join --player alice --mode 1s
//!   cargo run --bin arena-sim -- report --match-id ABCD1234 --player alice --winner team1
//!   cargo run --bin arena-sim -- leaderboard --limit 5
//!   cargo run --bin arena-sim -- simulate --players 12 --matches 50 --seed 7

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use ranked_arena::config::RankedSettings;
use ranked_arena::utils::current_timestamp;
use ranked_arena::{
    JoinOutcome, JsonFileStateStore, Mode, RankedEngine, ReportOutcome, Resolution, TeamSide,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "arena-sim")]
#[command(about = "Drive the ranked-arena engine from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding per-scope JSON state
    #[arg(long, default_value = "data/sim")]
    data_dir: PathBuf,

    /// Scope (server) to operate on
    #[arg(long, default_value = "sim")]
    scope: String,

    /// Seed for team splits, ids and rating swings
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a queue
    Join {
        #[arg(short, long)]
        player: String,
        /// Mode token (1s, 2s, 3s)
        #[arg(short, long)]
        mode: String,
    },
    /// Leave every queue
    Leave {
        #[arg(short, long)]
        player: String,
    },
    /// Report a match result
    Report {
        #[arg(long)]
        match_id: String,
        #[arg(short, long)]
        player: String,
        /// team1 or team2
        #[arg(short, long)]
        winner: String,
    },
    /// Show queue depths
    Status,
    /// Show the leaderboard
    Leaderboard {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Show a match
    ShowMatch {
        #[arg(long)]
        match_id: String,
    },
    /// Show a player's record
    Player {
        #[arg(short, long)]
        player: String,
    },
    /// Expire stale queue entries and matches
    Sweep,
    /// Play random matches between a pool of players
    Simulate {
        /// Size of the player pool
        #[arg(long, default_value = "12")]
        players: usize,
        /// Number of matches to play
        #[arg(long, default_value = "30")]
        matches: usize,
        /// Chance (0-1) that one player misreports, producing disputes
        #[arg(long, default_value = "0.1")]
        misreport_rate: f64,
    },
}

fn build_engine(cli: &Cli) -> Result<RankedEngine> {
    let store = Arc::new(JsonFileStateStore::new(cli.data_dir.clone()));
    let settings = RankedSettings::default();
    let engine = match cli.seed {
        Some(seed) => RankedEngine::with_seed(store, settings, seed)?,
        None => RankedEngine::new(store, settings)?,
    };
    Ok(engine)
}

fn print_resolution(resolution: &Resolution) {
    match resolution.winning_team {
        Some(team) => println!("🏆 Match {} won by {}", resolution.match_id, team),
        None => println!("⚖️  Match {} disputed", resolution.match_id),
    }
    for delta in &resolution.rating_deltas {
        println!(
            "    {:<16} {:+4} -> {}",
            delta.player_id, delta.delta, delta.new_rating
        );
    }
}

async fn simulate(
    engine: &RankedEngine,
    scope: &str,
    pool_size: usize,
    match_count: usize,
    misreport_rate: f64,
    seed: Option<u64>,
) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let pool: Vec<String> = (1..=pool_size).map(|i| format!("player{:02}", i)).collect();
    let misreport_rate = if misreport_rate.is_finite() {
        misreport_rate.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let modes: Vec<Mode> = Mode::ALL
        .iter()
        .copied()
        .filter(|mode| mode.required_players() <= pool.len())
        .collect();
    anyhow::ensure!(!modes.is_empty(), "need at least 2 players to simulate");

    for _ in 0..match_count {
        let mode = *modes
            .choose(&mut rng)
            .ok_or_else(|| anyhow::anyhow!("no modes available"))?;

        let cohort: Vec<&String> = pool
            .choose_multiple(&mut rng, mode.required_players())
            .collect();
        let mut formed = None;
        for player in &cohort {
            if let JoinOutcome::MatchFormed { formed: m } =
                engine.join_queue(scope, player, mode).await?
            {
                formed = Some(m);
            }
        }
        let formed = formed.ok_or_else(|| anyhow::anyhow!("{} queue did not fill", mode))?;

        let actual = if rng.gen_bool(0.5) {
            TeamSide::Team1
        } else {
            TeamSide::Team2
        };
        let participants: Vec<String> = formed.participants().cloned().collect();
        let liar = if rng.gen_bool(misreport_rate) {
            participants.choose(&mut rng).cloned()
        } else {
            None
        };

        for player in &participants {
            let claim = if Some(player) == liar.as_ref() {
                actual.opposite()
            } else {
                actual
            };
            if let ReportOutcome::Resolved(resolution) = engine
                .report_outcome(scope, &formed.match_id, player, claim)
                .await?
            {
                print!("[{}] ", mode);
                print_resolution(&resolution);
            }
        }
    }

    println!();
    println!("📊 Final standings:");
    for entry in engine.leaderboard(scope, Some(pool_size)).await? {
        println!(
            "  {:>2}. {:<12} {:>5}  {}W/{}L  {:.1}%",
            entry.rank,
            entry.player_id,
            entry.rating,
            entry.wins,
            entry.losses,
            entry.win_rate_percent
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let engine = build_engine(&cli)?;
    let scope = cli.scope.as_str();

    let result = match &cli.command {
        Commands::Join { player, mode } => engine
            .join_queue_token(scope, player, mode)
            .await
            .map(|outcome| match outcome {
                JoinOutcome::Waiting {
                    mode,
                    count,
                    required,
                    rating,
                } => println!(
                    "⏳ {} joined {} queue ({}/{}), rating {}",
                    player, mode, count, required, rating
                ),
                JoinOutcome::MatchFormed { formed } => {
                    println!("🎮 Match {} ({}) formed", formed.match_id, formed.mode);
                    println!("    Team 1: {}", formed.team1.join(", "));
                    println!("    Team 2: {}", formed.team2.join(", "));
                    println!("    Name: {}  Password: {}", formed.name, formed.password);
                }
            }),
        Commands::Leave { player } => engine.leave_queue(scope, player).await.map(|outcome| {
            let modes: Vec<_> = outcome.modes_left.iter().map(|m| m.label()).collect();
            println!("👋 {} left {}", player, modes.join(", "));
        }),
        Commands::Report {
            match_id,
            player,
            winner,
        } => engine
            .report_outcome_token(scope, match_id, player, winner)
            .await
            .map(|outcome| match outcome {
                ReportOutcome::Pending {
                    votes_team1,
                    votes_team2,
                    received,
                    required,
                    ..
                } => println!(
                    "📝 Report recorded ({}/{}), votes {}-{}",
                    received, required, votes_team1, votes_team2
                ),
                ReportOutcome::Resolved(resolution) => print_resolution(&resolution),
            }),
        Commands::Status => engine.queue_status(scope).await.map(|status| {
            for depth in &status.queues {
                println!("  {}: {}/{}", depth.mode, depth.count, depth.required);
            }
            println!("  Active matches: {}", status.active_matches);
        }),
        Commands::Leaderboard { limit } => {
            engine.leaderboard(scope, *limit).await.map(|entries| {
                for entry in entries {
                    println!(
                        "  {:>2}. {:<16} {:>5}  {}W/{}L  {:.1}%",
                        entry.rank,
                        entry.player_id,
                        entry.rating,
                        entry.wins,
                        entry.losses,
                        entry.win_rate_percent
                    );
                }
            })
        }
        Commands::ShowMatch { match_id } => engine
            .get_match(scope, match_id)
            .await
            .and_then(|m| {
                serde_json::to_string_pretty(&m)
                    .map(|json| println!("{}", json))
                    .map_err(|e| ranked_arena::RankedError::Internal {
                        message: e.to_string(),
                    })
            }),
        Commands::Player { player } => engine.get_player(scope, player).await.map(|record| {
            match record {
                Some(r) => println!(
                    "{}: rating {}, {}W/{}L ({} played, {:.1}%)",
                    r.player_id,
                    r.rating,
                    r.wins,
                    r.losses,
                    r.matches_played,
                    r.win_rate_percent()
                ),
                None => println!("{} has no record in scope {}", player, scope),
            }
        }),
        Commands::Sweep => engine
            .sweep_expired(scope, current_timestamp())
            .await
            .map(|report| {
                println!(
                    "🧹 Removed {} queue entries, closed {} matches",
                    report.expired_queue_entries.len(),
                    report.expired_matches.len()
                );
            }),
        Commands::Simulate {
            players,
            matches,
            misreport_rate,
        } => {
            return simulate(&engine, scope, *players, *matches, *misreport_rate, cli.seed).await;
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {} ({})", e, e.kind());
        std::process::exit(1);
    }
    Ok(())
}
