use anyhow::{anyhow, Result};
use clap::{arg, Command};
use serde::Serialize;
use std::{
    fs,
    io::Read,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};
use tig_algorithms::vector_search::optimax::solve_challenge;
use tig_challenges::vector_search::{Challenge, Difficulty, Solution};
use tig_native::{
    run_pipeline,
    vector_search::{DEFAULT_NUM_WORKSPACES, ERROR_CODE},
    WorkspacePool,
};
use tig_structs::{core::BenchmarkSettings, dejsonify, jsonify};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    Command::new("tig-runtime")
        .about("Computes, verifies or benchmarks vector search solutions")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("compute_solution")
                .about("Computes a solution")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(arg!(<NONCE> "Nonce value").value_parser(clap::value_parser!(u64)))
                .arg(
                    arg!(--output [OUTPUT_FILE] "If set, the output data will be saved to this file path")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("verify_solution")
                .about("Verifies a solution")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(arg!(<NONCE> "Nonce value").value_parser(clap::value_parser!(u64)))
                .arg(
                    arg!(<SOLUTION> "Solution json string, path to json file, or '-' for stdin")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
        .subcommand(
            Command::new("benchmark")
                .about("Runs the full pipeline over a range of nonces")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--"start-nonce" [START_NONCE] "First nonce")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"num-nonces" [NUM_NONCES] "Number of nonces to run")
                        .default_value("16")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--workers [WORKERS] "Number of worker threads")
                        .default_value("4")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--workspaces [WORKSPACES] "Number of pooled workspaces")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("compute_solution", sub_m)) => compute_solution(
            sub_m.get_one::<String>("SETTINGS").unwrap().clone(),
            *sub_m.get_one::<u64>("NONCE").unwrap(),
            sub_m.get_one::<PathBuf>("output").cloned(),
        ),
        Some(("verify_solution", sub_m)) => verify_solution(
            sub_m.get_one::<String>("SETTINGS").unwrap().clone(),
            *sub_m.get_one::<u64>("NONCE").unwrap(),
            sub_m.get_one::<String>("SOLUTION").unwrap().clone(),
        ),
        Some(("benchmark", sub_m)) => benchmark(
            sub_m.get_one::<String>("SETTINGS").unwrap().clone(),
            *sub_m.get_one::<u64>("start-nonce").unwrap(),
            *sub_m.get_one::<u64>("num-nonces").unwrap(),
            *sub_m.get_one::<usize>("workers").unwrap(),
            sub_m.get_one::<usize>("workspaces").cloned(),
        ),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[derive(Serialize)]
struct OutputData {
    nonce: u64,
    solution: Solution,
    avg_dist: Option<f32>,
}

#[derive(Serialize)]
struct BenchmarkSummary {
    start_nonce: u64,
    num_nonces: u64,
    num_valid: u64,
    num_wrong_count: u64,
    num_out_of_bounds: u64,
    num_threshold_exceeded: u64,
    num_failed: u64,
    elapsed_ms: u64,
}

pub fn compute_solution(settings: String, nonce: u64, output_file: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(&settings)?;
    let difficulty = load_difficulty(&settings)?;
    let seeds = settings.calc_seeds(nonce)?;

    let challenge = Challenge::generate_instance(seeds, &difficulty)?;
    let solution = solve_challenge(&challenge)?.unwrap_or_default();
    let avg_dist = challenge.verify_solution(&solution).ok();

    let output_data = jsonify(&OutputData {
        nonce,
        solution,
        avg_dist,
    })?;
    match output_file {
        Some(path) => {
            fs::write(&path, output_data)?;
            info!(path = %path.display(), "output data saved");
        }
        None => println!("{}", output_data),
    }
    Ok(())
}

pub fn verify_solution(settings: String, nonce: u64, solution: String) -> Result<()> {
    let settings = load_settings(&settings)?;
    let difficulty = load_difficulty(&settings)?;
    let solution = load_solution(&solution)?;
    let seeds = settings.calc_seeds(nonce)?;

    let challenge = Challenge::generate_instance(seeds, &difficulty)?;
    match challenge.verify_solution(&solution) {
        Ok(avg_dist) => {
            println!("Solution is valid. Average distance: {}", avg_dist);
            Ok(())
        }
        Err(e) => Err(anyhow!("Invalid solution: {} (code {})", e, e.code())),
    }
}

pub fn benchmark(
    settings: String,
    start_nonce: u64,
    num_nonces: u64,
    num_workers: usize,
    num_workspaces: Option<usize>,
) -> Result<()> {
    let settings = load_settings(&settings)?;
    let difficulty = load_difficulty(&settings)?;
    if num_workers == 0 {
        return Err(anyhow!("Number of workers must be at least 1"));
    }
    let pool =
        WorkspacePool::new(num_workspaces.unwrap_or(DEFAULT_NUM_WORKSPACES.min(num_workers)))?;

    let next_nonce = AtomicU64::new(start_nonce);
    let end_nonce = start_nonce.saturating_add(num_nonces);
    let codes: [AtomicU64; 5] = std::array::from_fn(|_| AtomicU64::new(0));
    info!(
        start_nonce,
        num_nonces,
        num_workers,
        num_workspaces = pool.num_workspaces(),
        "starting benchmark"
    );
    let start = Instant::now();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..num_workers)
            .map(|_| {
                s.spawn(|| -> Result<()> {
                    loop {
                        let nonce = next_nonce.fetch_add(1, Ordering::Relaxed);
                        if nonce >= end_nonce {
                            return Ok(());
                        }
                        let seeds = settings.calc_seeds(nonce)?;
                        let code = match run_pipeline(&pool, seeds, &difficulty) {
                            Ok(outcome) => outcome.code(),
                            Err(e) => {
                                warn!(nonce, "{}", e);
                                ERROR_CODE
                            }
                        };
                        codes[code as usize].fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("Benchmark worker panicked"))?)
            .collect::<Result<Vec<()>>>()
    })?;

    let [num_valid, num_wrong_count, num_out_of_bounds, num_threshold_exceeded, num_failed] =
        codes.map(|c| c.into_inner());
    let summary = BenchmarkSummary {
        start_nonce,
        num_nonces: end_nonce - start_nonce,
        num_valid,
        num_wrong_count,
        num_out_of_bounds,
        num_threshold_exceeded,
        num_failed,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    println!("{}", jsonify(&summary)?);
    Ok(())
}

fn load_settings(settings: &str) -> Result<BenchmarkSettings> {
    let settings = if settings.ends_with(".json") {
        fs::read_to_string(settings)
            .map_err(|e| anyhow!("Failed to read settings file {}: {}", settings, e))?
    } else {
        settings.to_string()
    };

    dejsonify::<BenchmarkSettings>(&settings).map_err(|e| anyhow!("Failed to parse settings: {}", e))
}

fn load_difficulty(settings: &BenchmarkSettings) -> Result<Difficulty> {
    match settings.challenge_id.as_str() {
        "c004" | "vector_search" => Difficulty::try_from(settings.difficulty.clone()),
        other => Err(anyhow!("Unsupported challenge: {}", other)),
    }
}

fn load_solution(solution: &str) -> Result<Solution> {
    let solution = if solution == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| anyhow!("Failed to read solution from stdin: {}", e))?;
        buffer
    } else if solution.ends_with(".json") {
        fs::read_to_string(solution)
            .map_err(|e| anyhow!("Failed to read solution file {}: {}", solution, e))?
    } else {
        solution.to_string()
    };

    dejsonify::<Solution>(&solution).map_err(|e| anyhow!("Failed to parse solution: {}", e))
}
