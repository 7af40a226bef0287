use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

use clap::Parser;
use capsule_lander::control::RandomPilot;
use capsule_lander::sim::{
    run_episodes, EpisodeSummary, SimulationOrchestrator, SimulationState, TrainingArea,
};
use capsule_lander::{Result, SimulationConfig};
use tracing::error;
use tracing_subscriber::EnvFilter;

const AREAS: usize = 4;
const EPISODES_PER_AREA: usize = 5;
const EXPLORE_PROBABILITY: f64 = 0.35;

#[derive(Debug, Parser)]
#[command(version, about = "Parallel capsule-lander training areas on the sandbox engine")]
struct Cli {
    /// SimulationConfig JSON file; defaults apply when omitted
    config: Option<PathBuf>,

    /// Print episode summaries as JSON instead of the table
    #[arg(long)]
    json: bool,

    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    // -----------------------------------------------------------------------
    // One orchestrator per training area, each on its own thread
    // -----------------------------------------------------------------------
    let (tx, rx) = mpsc::channel();
    std::thread::scope(|scope| {
        for index in 0..AREAS {
            let tx = tx.clone();
            let config = config.clone();
            scope.spawn(move || {
                let policy = RandomPilot::new(5, EXPLORE_PROBABILITY, config.seed ^ index as u64);
                let result = SimulationOrchestrator::sandbox(
                    TrainingArea::standard(index),
                    config,
                    Box::new(policy),
                )
                .and_then(|mut orch| run_episodes(&mut orch, EPISODES_PER_AREA))
                .map(|records| records.into_iter().map(|r| r.summary).collect::<Vec<_>>());
                let _ = tx.send((index, result));
            });
        }
    });
    drop(tx);

    let mut per_area: Vec<(usize, Result<Vec<EpisodeSummary>>)> = rx.into_iter().collect();
    per_area.sort_by_key(|(index, _)| *index);
    let mut summaries = Vec::new();
    for (_, result) in per_area {
        summaries.extend(result?);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    print_report(&config, &summaries);
    Ok(())
}

fn print_report(config: &SimulationConfig, summaries: &[EpisodeSummary]) {
    println!();
    println!("====================================================================");
    println!("  CAPSULE LANDER: {} areas x {} episodes", AREAS, EPISODES_PER_AREA);
    println!("====================================================================");
    println!();
    println!("  Configuration");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  dt:            {:>8.3} s     Step cap:     {:>8}",
        config.dt, config.max_steps
    );
    println!(
        "  Spawn height:  {:>8.1} m     Max speed:    {:>8.1} m/s",
        config.spawn.initial_height, config.spawn.max_initial_speed
    );
    println!(
        "  Training:      {:>8}       Seed:         {:>8}",
        config.is_training, config.seed
    );
    println!();

    println!("  Episodes");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  {:>4}  {:>7}  {:<20}  {:>6}  {:>9}  {:>8}",
        "area", "episode", "outcome", "steps", "return", "terminal"
    );
    println!("  {}", "─".repeat(64));
    for s in summaries {
        println!(
            "  {:>4}  {:>7}  {:<20}  {:>6}  {:>9.3}  {:>8.3}",
            s.area,
            s.episode,
            format!("{:?}", s.outcome),
            s.steps,
            s.total_reward,
            s.terminal_score
        );
    }
    println!();

    let count = summaries.len().max(1) as f64;
    let landed = summaries
        .iter()
        .filter(|s| s.outcome != SimulationState::Crashed)
        .count();
    let mean_return = summaries.iter().map(|s| s.total_reward).sum::<f64>() / count;
    let mean_terminal = summaries.iter().map(|s| s.terminal_score).sum::<f64>() / count;

    println!("  Summary");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Landed:        {:>8} / {}", landed, summaries.len());
    println!("  Mean return:   {:>8.3}", mean_return);
    println!("  Mean terminal: {:>8.3}", mean_terminal);
    println!("====================================================================");
    println!();
}
