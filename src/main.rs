//! Callsim command-line driver.
//!
//! # Usage
//!
//! ```bash
//! # One M/M/C/C run
//! callsim mmcc --servers 16 --arrivals 10000 --arrival-rate 0.1
//!
//! # Handover priority with two reserved servers, as JSON
//! callsim --json priority --servers 16 --threshold 2 --newcall-rate 0.1
//!
//! # Highest arrival rate that keeps blocking under 1%
//! callsim sweep-mmcc --from 0.01 --to 0.1 --points 100 --limit 0.01
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use callsim::config::{DEFAULT_ARRIVAL_RATE, DEFAULT_DEPARTURE_RATE, DEFAULT_HANDOVER_WEIGHT};
use callsim::sweep::{self, SweepPoint};
use callsim::{Mmcc, MmccConfig, PriorityConfig, PriorityMmcc, RunResult, TrafficClass};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Loss-system simulator
#[derive(Parser, Debug)]
#[command(name = "callsim")]
#[command(about = "Discrete-event simulator for M/M/C/C and M1/M2/M/C/C loss systems")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the single-class M/M/C/C model once
    Mmcc {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        rates: MmccArgs,
        /// Load the model configuration from a JSON file instead of flags
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the handover-priority M1/M2/M/C/C model once
    Priority {
        #[command(flatten)]
        run: RunArgs,
        /// Servers reserved for handovers
        #[arg(long, default_value_t = 2)]
        threshold: usize,
        #[command(flatten)]
        rates: PriorityArgs,
        /// Load the model configuration from a JSON file instead of flags
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Sweep the M/M/C/C arrival rate
    SweepMmcc {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        rates: MmccArgs,
        #[command(flatten)]
        grid: GridArgs,
        /// Blocking probability budget
        #[arg(long, default_value_t = 0.01)]
        limit: f64,
    },
    /// Sweep one arrival rate of the handover-priority model
    SweepPriority {
        #[command(flatten)]
        run: RunArgs,
        /// Servers reserved for handovers
        #[arg(long, default_value_t = 2)]
        threshold: usize,
        /// Which arrival stream to sweep
        #[arg(long, value_enum, default_value_t = SweptClass::Newcall)]
        sweep: SweptClass,
        #[command(flatten)]
        rates: PriorityArgs,
        #[command(flatten)]
        grid: GridArgs,
        /// Aggregated blocking probability budget
        #[arg(long, default_value_t = 0.02)]
        limit: f64,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Number of servers
    #[arg(long, default_value_t = 16)]
    servers: u32,

    /// Stop after this many arrivals
    #[arg(long, default_value_t = 10_000)]
    arrivals: u64,

    /// Seed for the variate stream
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Args, Debug)]
struct MmccArgs {
    /// Arrival rate
    #[arg(long, default_value_t = DEFAULT_ARRIVAL_RATE)]
    arrival_rate: f64,

    /// Departure (service) rate
    #[arg(long, default_value_t = DEFAULT_DEPARTURE_RATE)]
    departure_rate: f64,
}

#[derive(Args, Debug)]
struct PriorityArgs {
    /// Handover arrival rate
    #[arg(long, default_value_t = 0.03)]
    handover_rate: f64,

    /// New-call arrival rate
    #[arg(long, default_value_t = DEFAULT_ARRIVAL_RATE)]
    newcall_rate: f64,

    /// Departure (service) rate
    #[arg(long, default_value_t = DEFAULT_DEPARTURE_RATE)]
    departure_rate: f64,

    /// Weight of handover failures in the aggregated blocking probability
    #[arg(long, default_value_t = DEFAULT_HANDOVER_WEIGHT)]
    handover_weight: f64,
}

#[derive(Args, Debug)]
struct GridArgs {
    /// First rate of the grid
    #[arg(long, default_value_t = 0.01)]
    from: f64,

    /// Last rate of the grid
    #[arg(long, default_value_t = 0.1)]
    to: f64,

    /// Number of grid points
    #[arg(long, default_value_t = 100)]
    points: usize,

    /// Space the grid geometrically instead of linearly
    #[arg(long)]
    geometric: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SweptClass {
    Newcall,
    Handover,
}

type SweepFn =
    fn(&PriorityConfig, u32, u64, usize, &[f64]) -> callsim::SimResult<Vec<SweepPoint>>;

impl GridArgs {
    fn rates(&self) -> callsim::SimResult<Vec<f64>> {
        if self.geometric {
            sweep::geomspace(self.from, self.to, self.points)
        } else {
            sweep::linspace(self.from, self.to, self.points)
        }
    }
}

fn mmcc_config(rates: &MmccArgs, seed: u64) -> MmccConfig {
    MmccConfig::default()
        .with_arrival_rate(rates.arrival_rate)
        .with_departure_rate(rates.departure_rate)
        .with_seed(seed)
}

fn priority_config(rates: &PriorityArgs, seed: u64) -> PriorityConfig {
    PriorityConfig::default()
        .with_handover_rate(rates.handover_rate)
        .with_newcall_rate(rates.newcall_rate)
        .with_departure_rate(rates.departure_rate)
        .with_handover_weight(rates.handover_weight)
        .with_seed(seed)
}

fn load_config<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(serde_json::from_str(&text)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Mmcc { run, rates, config } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => mmcc_config(&rates, run.seed),
            };
            let result = Mmcc::new(config)?.run(run.servers, run.arrivals)?;
            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
            } else {
                write_result(&mut out, &result)?;
            }
        }
        Command::Priority {
            run,
            threshold,
            rates,
            config,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => priority_config(&rates, run.seed),
            };
            let result = PriorityMmcc::new(config)?.run(run.servers, run.arrivals, threshold)?;
            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
            } else {
                write_result(&mut out, &result)?;
            }
        }
        Command::SweepMmcc {
            run,
            rates,
            grid,
            limit,
        } => {
            let config = mmcc_config(&rates, run.seed);
            let grid = grid.rates()?;
            let points = sweep::mmcc_arrival_sweep(&config, run.servers, run.arrivals, &grid)?;
            write_sweep(&mut out, &points, limit, cli.json)?;
        }
        Command::SweepPriority {
            run,
            threshold,
            sweep: swept,
            rates,
            grid,
            limit,
        } => {
            let config = priority_config(&rates, run.seed);
            let grid = grid.rates()?;
            let sweep_fn: SweepFn = match swept {
                SweptClass::Newcall => sweep::priority_newcall_sweep,
                SweptClass::Handover => sweep::priority_handover_sweep,
            };
            let points = sweep_fn(&config, run.servers, run.arrivals, threshold, &grid)?;
            write_sweep(&mut out, &points, limit, cli.json)?;
        }
    }

    Ok(())
}

fn write_result<W: Write>(out: &mut W, result: &RunResult) -> io::Result<()> {
    writeln!(out, "servers:             {}", result.server_count)?;
    if result.handover_weight.is_some() {
        writeln!(out, "reserved:            {}", result.threshold)?;
    }
    for (class, arrivals) in &result.arrivals {
        writeln!(
            out,
            "{:<9} arrivals:  {} (blocked {})",
            class.as_str(),
            arrivals,
            result.blocked_of(*class)
        )?;
    }
    writeln!(out, "departed:            {}", result.departed)?;
    writeln!(out, "in service:          {}", result.in_service)?;
    writeln!(out, "final time:          {:.3}", result.final_time.as_f64())?;
    if let Some(weight) = result.handover_weight {
        writeln!(out, "CBP:                 {:.6}", result.call_blocking_probability())?;
        writeln!(out, "HFP:                 {:.6}", result.handover_failure_probability())?;
        writeln!(out, "ABP (weight {weight}):   {:.6}", result.blocking_probability())?;
    } else {
        writeln!(
            out,
            "blocking:            {:.6}",
            result.blocking_probability_for(TrafficClass::Single)
        )?;
    }
    writeln!(out, "utilisation:         {:.4}", result.server_utilisation())?;
    Ok(())
}

fn write_sweep<W: Write>(
    out: &mut W,
    points: &[SweepPoint],
    limit: f64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let best = sweep::best_under(points, limit);
    if json {
        let doc = serde_json::json!({
            "points": points,
            "limit": limit,
            "best_rate": best.map(|p| p.rate),
            "mean_bias": sweep::mean_bias(points),
            "mean_absolute_error": sweep::mean_absolute_error(points),
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&doc)?)?;
        return Ok(());
    }

    writeln!(
        out,
        "{:>10}  {:>10}  {:>10}  {:>10}  {:>10}",
        "rate", "blocking", "expected", "util", "expected"
    )?;
    for p in points {
        writeln!(
            out,
            "{:>10.5}  {:>10.6}  {:>10.6}  {:>10.4}  {:>10.4}",
            p.rate,
            p.result.blocking_probability(),
            p.expected_blocking,
            p.result.server_utilisation(),
            p.expected_utilisation
        )?;
    }
    writeln!(
        out,
        "mean (simulated - expected):   {:+.6}",
        sweep::mean_bias(points)
    )?;
    writeln!(
        out,
        "mean |simulated - expected|:   {:.6}",
        sweep::mean_absolute_error(points)
    )?;
    match best {
        Some(p) => writeln!(out, "best rate below {limit}: {:.5}", p.rate)?,
        None => writeln!(out, "no rate keeps blocking below {limit}")?,
    }
    Ok(())
}
