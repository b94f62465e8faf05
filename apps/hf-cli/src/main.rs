use clap::{Parser, Subcommand};
use hf_heli::{HeliParams, HeliResult, Helicopter, OBSERVATION_LABELS, REQUIRED, build_system};
use hf_project::load_yaml_validated;
use hf_sim::DynamicSystem;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hf-cli")]
#[command(about = "HeliFlow CLI - Helicopter flight dynamics simulation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a vehicle file and print its derived constants
    Validate {
        /// Path to the vehicle YAML file
        config: PathBuf,
    },
    /// Trim the vehicle and print the equilibrium
    Trim {
        /// Path to the vehicle YAML file
        config: PathBuf,
        /// Ignore the terrain rasters and fly over level ground
        #[arg(long)]
        flat: bool,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Trim, then hold the trimmed action for a number of steps
    Run {
        /// Path to the vehicle YAML file
        config: PathBuf,
        /// Time step in seconds
        #[arg(long, default_value_t = 0.01)]
        dt: f64,
        /// Number of steps
        #[arg(long, default_value_t = 1000)]
        steps: usize,
        /// Seed for wind randomization and turbulence
        #[arg(long)]
        seed: Option<u64>,
        /// Ignore the terrain rasters and fly over level ground
        #[arg(long)]
        flat: bool,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read or change one parameter
    Param {
        /// Path to the vehicle YAML file
        config: PathBuf,
        node: String,
        field: String,
        /// New value; the vehicle is re-trimmed with it
        #[arg(long)]
        set: Option<f64>,
    },
}

#[derive(Serialize)]
struct TrimSummary {
    converged: bool,
    iterations: usize,
    cost: f64,
    action: Vec<f64>,
    observations: Vec<(String, f64)>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Trim { config, flat, json } => cmd_trim(&config, flat, json),
        Commands::Run {
            config,
            dt,
            steps,
            seed,
            flat,
            output,
        } => cmd_run(&config, dt, steps, seed, flat, output.as_deref()),
        Commands::Param {
            config,
            node,
            field,
            set,
        } => cmd_param(&config, &node, &field, set),
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn load(config: &Path, flat: bool, dt: f64) -> HeliResult<DynamicSystem<Helicopter>> {
    let heli = if flat {
        Helicopter::with_flat_terrain(load_yaml_validated(config, REQUIRED)?)?
    } else {
        Helicopter::from_file(config)?
    };
    build_system(heli, dt)
}

fn cmd_validate(config: &Path) -> HeliResult<()> {
    println!("Validating vehicle: {}", config.display());
    let mut tree = load_yaml_validated(config, REQUIRED)?;
    let params = HeliParams::from_tree(&mut tree)?;
    println!("✓ Vehicle is valid");
    println!("  Mass:            {:.2} slug", params.mass);
    println!("  MR tip speed:    {:.1} ft/s", params.main_rotor.tip_speed());
    println!("  MR speed:        {:.2} rad/s", params.main_rotor.omega());
    println!("  TR tip speed:    {:.1} ft/s", params.tail_rotor.tip_speed());
    Ok(())
}

fn observation_pairs(sim: &DynamicSystem<Helicopter>) -> Vec<(String, f64)> {
    OBSERVATION_LABELS
        .iter()
        .zip(sim.observation().values().iter())
        .map(|(label, v)| (label.to_string(), *v))
        .collect()
}

fn cmd_trim(config: &Path, flat: bool, json: bool) -> HeliResult<()> {
    let mut sim = load(config, flat, 0.01)?;
    let started = Instant::now();
    let ready = sim.reset()?;
    let elapsed = started.elapsed().as_secs_f64();

    let (iterations, cost) = sim
        .last_trim()
        .map(|r| (r.iterations, r.cost))
        .unwrap_or((0, f64::NAN));
    let summary = TrimSummary {
        converged: ready,
        iterations,
        cost,
        action: sim.action().values().iter().copied().collect(),
        observations: observation_pairs(&sim),
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(e) => warn!("failed to encode trim summary: {e}"),
        }
        return Ok(());
    }

    if summary.converged {
        println!("✓ Trim converged in {} iterations ({:.3}s)", iterations, elapsed);
    } else {
        println!("✗ Trim did not converge after {} iterations", iterations);
    }
    println!("  Cost: {:.3e}", cost);
    println!(
        "  Action: [{}]",
        summary
            .action
            .iter()
            .map(|v| format!("{v:.5}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("\nObservations:");
    for (label, v) in &summary.observations {
        println!("  {:<16} {:>14.6}", label, v);
    }
    Ok(())
}

fn cmd_run(
    config: &Path,
    dt: f64,
    steps: usize,
    seed: Option<u64>,
    flat: bool,
    output: Option<&Path>,
) -> HeliResult<()> {
    let mut sim = load(config, flat, dt)?;
    if let Some(seed) = seed {
        sim.seed(seed);
    }
    if !sim.reset()? {
        warn!("trim did not converge, flying the best point found");
    }
    let action: Vec<f64> = sim.action().values().iter().copied().collect();

    let mut csv = format!("time_s,{}\n", OBSERVATION_LABELS.join(","));
    let mut push_row = |t: f64, sim: &DynamicSystem<Helicopter>| {
        let row: Vec<String> = sim.observation().values().iter().map(|v| v.to_string()).collect();
        csv.push_str(&format!("{},{}\n", t, row.join(",")));
    };
    push_row(0.0, &sim);

    let started = Instant::now();
    let mut completed = 0;
    for i in 1..=steps {
        let ready = sim.step(&action)?;
        push_row(i as f64 * dt, &sim);
        completed = i;
        if !ready {
            warn!(step = i, "state diverged, stopping");
            break;
        }
    }
    info!(
        steps = completed,
        wall_s = started.elapsed().as_secs_f64(),
        "run finished"
    );

    if let Some(path) = output {
        std::fs::write(path, csv).map_err(hf_project::ProjectError::from)?;
        println!("✓ Exported {} steps to {}", completed, path.display());
    } else {
        print!("{}", csv);
    }
    Ok(())
}

fn cmd_param(config: &Path, node: &str, field: &str, set: Option<f64>) -> HeliResult<()> {
    let mut sim = load(config, true, 0.01)?;
    if let Some(value) = set {
        sim.set_parameter(node, field, value)?;
        let ready = sim.reset()?;
        println!("{}.{} = {} (trim converged: {})", node, field, value, ready);
    }
    println!("{}.{} = {}", node, field, sim.parameter(node, field)?);
    Ok(())
}
