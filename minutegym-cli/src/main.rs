//! MinuteGym CLI: repair, normalize, collect, sample and simulate commands.
//!
//! Commands:
//! - `repair`: replace a counter time axis with real trading minutes
//! - `normalize`: turn a raw payload (one day, or a whole file) into a canonical minute file
//! - `resample`: aggregate a minute file into N-minute bars
//! - `collect`: gather a date range for a stock code from a raw CSV tree
//! - `sample`: write a synthetic random-walk minute file
//! - `simulate`: roll a policy through the market simulator

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use minutegym_core::config::MinuteGymConfig;
use minutegym_core::data::csv_io::{read_series_from_path, write_series_to_path};
use minutegym_core::data::download::collected_file_name;
use minutegym_core::data::{
    anomaly_report, collect_symbol, generate_sessions, normalize_file, resample_minutes,
    try_normalize_day, CsvDirProvider, RawTable, StdoutProgress,
};
use minutegym_core::domain::OhlcvSeries;
use minutegym_core::features::FeatureSet;
use minutegym_core::repair::{counter_rows_from_table, repair_counter_axis};
use minutegym_core::sim::{
    evaluate_random_seeds, run_episode, EpisodeSummary, HoldPolicy, MarketSimulator, Policy,
    RandomPolicy, SmaCrossPolicy,
};

#[derive(Parser)]
#[command(
    name = "minutegym",
    about = "MinuteGym CLI: A-share minute data tooling and market simulator"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. info, debug, minutegym_core=trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace an integer counter column with real trading-minute timestamps.
    Repair {
        /// Input CSV whose time column holds 0, 1, 2, ...
        input: PathBuf,

        /// First date of the intended range (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// Last date of the intended range (YYYY-MM-DD). Extended forward as needed.
        #[arg(long)]
        end: String,

        /// Output path. Defaults to `<input stem>_ts.csv` beside the input.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Normalize a raw minute payload (any supported column labels).
    Normalize {
        /// Raw CSV payload.
        input: PathBuf,

        /// Keep only this trading day (YYYY-MM-DD). Without it the whole file is
        /// cleaned and every time value must be a full timestamp.
        #[arg(long)]
        day: Option<String>,

        /// Whole-file mode: forward/back fill unparseable cells instead of dropping rows.
        #[arg(long, default_value_t = false, conflicts_with = "day")]
        fill_gaps: bool,

        /// Output path. Defaults to `<input stem>_norm.csv` (one day) or
        /// `<input stem>_clean.csv` (whole file) beside the input.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Aggregate a canonical minute file into coarser bars.
    Resample {
        /// Canonical minute CSV.
        input: PathBuf,

        /// Bar width in minutes.
        #[arg(long)]
        minutes: u32,

        /// Output path. Defaults to `<input stem>_<N>m.csv` beside the input.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Collect a stock code over a date range from a raw per-day CSV tree.
    Collect {
        /// Bare six-digit code (e.g. 600000). The sh/sz prefix is resolved automatically.
        #[arg(long)]
        symbol: String,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        end: String,

        /// Root of the raw tree laid out as `<root>/<prefix><code>/<YYYY-MM-DD>.csv`.
        #[arg(long)]
        raw_dir: PathBuf,

        /// Bar frequency in minutes for the output; 1-minute input is resampled when larger.
        #[arg(long, default_value_t = 1)]
        freq: u32,

        /// Output directory for the merged file.
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },
    /// Generate a synthetic minute series over consecutive trading days.
    Sample {
        /// First trading day (YYYY-MM-DD). Weekends roll forward.
        #[arg(long)]
        start: String,

        /// Number of trading sessions to generate.
        #[arg(long, default_value_t = 5)]
        days: usize,

        /// Output path.
        #[arg(long, default_value = "synthetic_1m_ts.csv")]
        out: PathBuf,
    },
    /// Run a policy through the simulator over a canonical minute file.
    Simulate {
        /// Canonical minute CSV (datetime, open, high, low, close, volume).
        input: PathBuf,

        /// Policy to roll out.
        #[arg(long, value_enum, default_value_t = PolicyKind::SmaCross)]
        policy: PolicyKind,

        /// Number of seeds for the random policy; evaluated in parallel. Other
        /// policies are deterministic and accept only 1.
        #[arg(long, default_value_t = 1)]
        seeds: u64,

        /// Print summaries as JSON lines instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    Hold,
    Random,
    #[value(name = "sma")]
    SmaCross,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match &cli.config {
        Some(path) => MinuteGymConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MinuteGymConfig::default(),
    };

    match cli.command {
        Commands::Repair {
            input,
            start,
            end,
            out,
        } => run_repair(&config, &input, &start, &end, out),
        Commands::Normalize {
            input,
            day,
            fill_gaps,
            out,
        } => run_normalize(&input, day.as_deref(), fill_gaps, out),
        Commands::Resample {
            input,
            minutes,
            out,
        } => run_resample(&input, minutes, out),
        Commands::Collect {
            symbol,
            start,
            end,
            raw_dir,
            freq,
            out_dir,
        } => run_collect(&symbol, &start, &end, raw_dir, freq, &out_dir),
        Commands::Sample { start, days, out } => run_sample(&config, &start, days, &out),
        Commands::Simulate {
            input,
            policy,
            seeds,
            json,
        } => run_simulate(&config, &input, policy, seeds, json),
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}{suffix}.csv"))
}

fn run_repair(
    config: &MinuteGymConfig,
    input: &Path,
    start: &str,
    end: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    if start > end {
        bail!("start date {start} is after end date {end}");
    }

    let table = RawTable::from_path(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let rows = counter_rows_from_table(&table)?;
    let series = repair_counter_axis(&rows, start, end, &config.calendar_builder()?)?;

    let out = out.unwrap_or_else(|| sibling_path(input, "_ts"));
    write_series_to_path(&series, &out)?;
    print_span("Repaired", &series, &out);
    Ok(())
}

fn run_normalize(
    input: &Path,
    day: Option<&str>,
    fill_gaps: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let table = RawTable::from_path(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let (series, suffix) = match day {
        Some(day) => {
            let day = parse_date(day)?;
            let series = try_normalize_day(&table, day)
                .with_context(|| format!("normalizing {} for {day}", input.display()))?;
            (series, "_norm")
        }
        None => {
            let series = normalize_file(&table, fill_gaps)
                .with_context(|| format!("cleaning {}", input.display()))?;
            (series, "_clean")
        }
    };
    anomaly_report(&series)?;

    let out = out.unwrap_or_else(|| sibling_path(input, suffix));
    write_series_to_path(&series, &out)?;
    print_span("Normalized", &series, &out);
    Ok(())
}

fn run_resample(input: &Path, minutes: u32, out: Option<PathBuf>) -> Result<()> {
    let series = read_series_from_path(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let resampled = resample_minutes(&series, minutes)?;

    let out = out.unwrap_or_else(|| sibling_path(input, &format!("_{minutes}m")));
    write_series_to_path(&resampled, &out)?;
    print_span("Resampled", &resampled, &out);
    Ok(())
}

fn run_collect(
    code: &str,
    start: &str,
    end: &str,
    raw_dir: PathBuf,
    freq: u32,
    out_dir: &Path,
) -> Result<()> {
    if freq == 0 {
        bail!("--freq must be at least 1 minute");
    }
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    let provider = CsvDirProvider::new(raw_dir);

    let mut collected = collect_symbol(&provider, code, start, end, &StdoutProgress)?;
    anomaly_report(&collected.series)?;
    if freq > 1 {
        collected.series = resample_minutes(&collected.series, freq)?;
    }

    let name = collected_file_name(code, freq, collected.prefix);
    let out = out_dir.join(name);
    write_series_to_path(&collected.series, &out)?;

    let summary = &collected.summary;
    println!(
        "{}: {}/{} days collected",
        summary.symbol, summary.days_ok, summary.days_total
    );
    for (day, reason) in &summary.skipped {
        println!("  skipped {day}: {reason}");
    }
    print_span("Collected", &collected.series, &out);
    Ok(())
}

fn run_sample(config: &MinuteGymConfig, start: &str, days: usize, out: &Path) -> Result<()> {
    let start = parse_date(start)?;
    let mut rng = config.rng().rng_for("synthetic", 0);
    let series = generate_sessions(
        &config.calendar_builder()?,
        start,
        days,
        config.synthetic.params,
        &mut rng,
    )?;
    write_series_to_path(&series, out)?;
    print_span("Generated", &series, out);
    Ok(())
}

fn run_simulate(
    config: &MinuteGymConfig,
    input: &Path,
    policy: PolicyKind,
    seeds: u64,
    json: bool,
) -> Result<()> {
    check_seeds(policy, seeds)?;
    let series = read_series_from_path(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let fs = FeatureSet::from_series(&series, config.features.sma_short, config.features.sma_long)?;
    let (features, prices) = fs.into_parts();
    let features = Arc::new(features);
    let prices: Arc<[f64]> = Arc::from(prices);

    let summaries: Vec<(Option<u64>, EpisodeSummary)> = match policy {
        PolicyKind::Random if seeds > 1 => {
            let hierarchy = config.rng();
            let seeds: Vec<u64> = (0..seeds).map(|i| hierarchy.sub_seed("policy", i)).collect();
            evaluate_random_seeds(features, prices, config.simulator, &seeds)?
                .into_iter()
                .map(|(seed, summary)| (Some(seed), summary))
                .collect()
        }
        _ => {
            let mut sim = MarketSimulator::from_shared(features, prices, config.simulator)?;
            let mut boxed: Box<dyn Policy> = match policy {
                PolicyKind::Hold => Box::new(HoldPolicy),
                PolicyKind::SmaCross => Box::new(SmaCrossPolicy),
                PolicyKind::Random => Box::new(RandomPolicy::new(config.rng().sub_seed("policy", 0))),
            };
            vec![(None, run_episode(&mut sim, boxed.as_mut())?)]
        }
    };

    if json {
        for (seed, summary) in &summaries {
            let mut value = serde_json::to_value(summary)?;
            if let (Some(seed), Some(obj)) = (seed, value.as_object_mut()) {
                obj.insert("seed".into(), serde_json::Value::from(*seed));
            }
            println!("{value}");
        }
    } else {
        print_summaries(&summaries);
    }
    Ok(())
}

fn check_seeds(policy: PolicyKind, seeds: u64) -> Result<()> {
    if seeds == 0 {
        bail!("--seeds must be at least 1");
    }
    if seeds > 1 && policy != PolicyKind::Random {
        bail!("--seeds {seeds} only applies to --policy random; hold and sma are deterministic");
    }
    Ok(())
}

fn print_span(verb: &str, series: &OhlcvSeries, out: &Path) {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => println!(
            "{verb} {} bars ({} .. {}) -> {}",
            series.len(),
            first.datetime,
            last.datetime,
            out.display()
        ),
        _ => println!("{verb} 0 bars -> {}", out.display()),
    }
}

fn print_summaries(summaries: &[(Option<u64>, EpisodeSummary)]) {
    println!();
    println!("=== Episode Summary ===");
    println!(
        "{:<12} {:>22} {:>7} {:>11} {:>10} {:>10} {:>8} {:>7}",
        "Policy", "Seed", "Steps", "Reward", "Cost", "Equity", "MaxDD", "Trades"
    );
    println!("{}", "-".repeat(96));
    for (seed, s) in summaries {
        let seed = seed.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        println!(
            "{:<12} {:>22} {:>7} {:>11.5} {:>10.5} {:>10.4} {:>7.2}% {:>7}",
            s.policy,
            seed,
            s.steps,
            s.total_reward,
            s.total_cost,
            s.final_equity,
            s.max_drawdown * 100.0,
            s.trades
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_only_for_the_random_policy() {
        assert!(check_seeds(PolicyKind::Random, 8).is_ok());
        assert!(check_seeds(PolicyKind::SmaCross, 1).is_ok());
        assert!(check_seeds(PolicyKind::SmaCross, 4).is_err());
        assert!(check_seeds(PolicyKind::Hold, 2).is_err());
        assert!(check_seeds(PolicyKind::Random, 0).is_err());
    }

    #[test]
    fn collect_freq_is_its_own_flag() {
        let cli = Cli::try_parse_from([
            "minutegym", "collect", "--symbol", "600000", "--start", "2025-01-02", "--end",
            "2025-01-03", "--raw-dir", "raw", "--freq", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Collect { freq, .. } => assert_eq!(freq, 5),
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn normalize_without_day_is_whole_file_mode() {
        let cli = Cli::try_parse_from(["minutegym", "normalize", "in.csv", "--fill-gaps"]).unwrap();
        match cli.command {
            Commands::Normalize { day, fill_gaps, .. } => {
                assert!(day.is_none());
                assert!(fill_gaps);
            }
            _ => panic!("expected normalize"),
        }
        assert!(Cli::try_parse_from([
            "minutegym", "normalize", "in.csv", "--day", "2025-01-02", "--fill-gaps"
        ])
        .is_err());
    }

    #[test]
    fn sibling_paths_keep_the_directory() {
        assert_eq!(
            sibling_path(Path::new("data/605069_1m_sh.csv"), "_5m"),
            PathBuf::from("data/605069_1m_sh_5m.csv")
        );
    }
}
