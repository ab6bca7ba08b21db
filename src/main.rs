use clap::{Parser, ValueEnum};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use smtsampler::oracle::z3_backend::Z3Backend;
use smtsampler::sampling::{BitVecTargeting, RunReport, Sampler, SamplerConfig, Strategy};
use smtsampler::store::{results_path, SampleStore};
use std::path::{Path, PathBuf};
use std::time::Duration;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "smtsampler")]
#[command(about = "smtsampler - diverse satisfying assignments for SMT formulas")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Args {
    /// SMT-LIB2 formula to sample; samples go to <INPUT>.samples
    input: PathBuf,

    // --- Limits ---
    /// Maximum number of sampling attempts
    #[arg(short = 'n', long, default_value = "1000000")]
    samples: u64,
    /// Maximum wall-clock time in seconds
    #[arg(short = 't', long, default_value = "3600")]
    time: f64,
    /// Maximum number of epochs
    #[arg(long)]
    epochs: Option<u64>,
    /// Maximum samples recorded in one epoch
    #[arg(long)]
    epoch_samples: Option<u64>,
    /// Maximum wall-clock time of one epoch in seconds
    #[arg(long)]
    epoch_time: Option<f64>,
    /// Solver timeout per check in seconds
    #[arg(long, default_value = "50")]
    solver_timeout: u64,

    // --- Strategy ---
    /// Sampling strategy
    #[arg(long, value_enum, default_value = "smtbit")]
    strategy: CliStrategy,
    /// Bit-vector targeting (defaults to what the strategy implies)
    #[arg(long, value_enum)]
    targeting: Option<CliTargeting>,
    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

/// CLI strategy selection
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliStrategy {
    /// MAX-SMT with one soft constraint per bit
    Smtbit,
    /// MAX-SMT with one soft equality per bit-vector
    Smtbv,
    /// Conversion to SAT (not supported)
    Sat,
}

impl From<CliStrategy> for Strategy {
    fn from(cli: CliStrategy) -> Self {
        match cli {
            CliStrategy::Smtbit => Strategy::SmtBit,
            CliStrategy::Smtbv => Strategy::SmtBv,
            CliStrategy::Sat => Strategy::Sat,
        }
    }
}

/// CLI bit-vector targeting selection
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliTargeting {
    /// Independent soft constraint on every bit
    PerBit,
    /// One soft equality to a random numeral
    WholeValue,
}

impl From<CliTargeting> for BitVecTargeting {
    fn from(cli: CliTargeting) -> Self {
        match cli {
            CliTargeting::PerBit => BitVecTargeting::PerBit,
            CliTargeting::WholeValue => BitVecTargeting::WholeValue,
        }
    }
}

/// Convert a seconds argument, rejecting negative, NaN and overflowing values
fn seconds(flag: &str, secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| format!("Invalid value {} for {}: {}", secs, flag, e))
}

fn sampler_config(args: &Args) -> Result<SamplerConfig, String> {
    let mut config = SamplerConfig::default()
        .with_max_samples(args.samples)
        .with_max_time(seconds("--time", args.time)?)
        .with_solver_timeout(Duration::from_secs(args.solver_timeout))
        .with_strategy(args.strategy.into())
        .with_seed_option(args.seed);

    if let Some(epochs) = args.epochs {
        config = config.with_max_epochs(epochs);
    }
    if let Some(samples) = args.epoch_samples {
        config = config.with_max_epoch_samples(samples);
    }
    if let Some(time) = args.epoch_time {
        config = config.with_max_epoch_time(seconds("--epoch-time", time)?);
    }
    if let Some(targeting) = args.targeting {
        config = config.with_targeting(targeting.into());
    }
    Ok(config)
}

fn sample_formula(
    input: &Path,
    config: SamplerConfig,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    config.validate()?;

    let backend = Z3Backend::from_file(input, config.solver_timeout)?;
    let store = SampleStore::create(input)?;
    let mut sampler = Sampler::new(backend, store, config)?;

    Ok(sampler.run()?)
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Could not set up logging: {}", e);
    }

    let config = match sampler_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    match sample_formula(&args.input, config) {
        Ok(report) => {
            println!("Stopped: {}", report.stop_reason);
            if report.stop_reason.sampled() {
                println!(
                    "{} unique samples written to {}",
                    report.statistics.unique_samples,
                    results_path(&args.input).display()
                );
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_accepts_fractions() {
        assert_eq!(seconds("--time", 1.5), Ok(Duration::from_millis(1500)));
        assert_eq!(seconds("--time", 0.0), Ok(Duration::ZERO));
    }

    #[test]
    fn test_seconds_rejects_out_of_range() {
        for secs in [f64::INFINITY, f64::NAN, -1.0, 1e30] {
            let err = seconds("--time", secs).unwrap_err();
            assert!(err.contains("--time"), "{}", err);
        }
    }

    #[test]
    fn test_infinite_time_is_reported() {
        let args = Args::parse_from(["smtsampler", "f.smt2", "-t", "inf"]);
        assert!(sampler_config(&args).is_err());

        let args = Args::parse_from(["smtsampler", "f.smt2", "--epoch-time", "1e30"]);
        assert!(sampler_config(&args).is_err());
    }
}
