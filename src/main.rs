use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use cache_sweep::{
    cache::{Associativity, ReplacementPolicy},
    charts::{ChartBaseline, standard_charts},
    experiments::{SweepConfig, run_scenarios, scenarios},
    pipeline::{Constraints, build_series, parse_constraint},
    render, summary,
    results::{Field, FieldValue, ResultTable},
    trace::{self, TraceFile, TracePattern},
};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use rand::{SeedableRng, rngs::StdRng};

#[derive(Parser)]
#[command(name = "cache-sweep", version)]
#[command(about = "Run cache simulation sweeps and chart hit-rate sensitivity")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate every configuration of a sweep against a trace and write the result table
    Simulate(SimulateArgs),
    /// Write a synthetic memory-access trace
    GenerateTrace(GenerateTraceArgs),
    /// Print the comparison series and summary for a result table and render the charts
    Analyze(AnalyzeArgs),
    /// Print one series for arbitrary fixed constraints
    Query(QueryArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// Trace file with one `<op> <address> [size]` access per line
    #[arg(short, long)]
    trace: PathBuf,

    /// Result table to write
    #[arg(short, long, default_value = "experiment_results.csv")]
    output: PathBuf,

    /// Cache size exponents (size = 2^exp bytes) [default: 8,9,10,11]
    #[arg(long = "cache-size-exp", value_delimiter = ',')]
    cache_size_exps: Vec<u32>,

    /// Line size exponents (size = 2^exp bytes) [default: 4,5,6]
    #[arg(long = "line-size-exp", value_delimiter = ',')]
    line_size_exps: Vec<u32>,

    /// Associativities: direct, <N>way, fully [default: direct,2way,4way,fully]
    #[arg(long = "associativity", value_delimiter = ',')]
    associativities: Vec<Associativity>,

    /// Replacement policies: lru, fifo [default: lru,fifo]
    #[arg(long = "policy", value_delimiter = ',')]
    policies: Vec<ReplacementPolicy>,
}

impl SimulateArgs {
    fn sweep(&self) -> SweepConfig {
        let defaults = SweepConfig::default();
        SweepConfig {
            cache_size_exps: or_default(&self.cache_size_exps, defaults.cache_size_exps),
            line_size_exps: or_default(&self.line_size_exps, defaults.line_size_exps),
            associativities: or_default(&self.associativities, defaults.associativities),
            policies: or_default(&self.policies, defaults.policies),
        }
    }
}

fn or_default<T: Clone>(given: &[T], default: Vec<T>) -> Vec<T> {
    if given.is_empty() {
        default
    } else {
        given.to_vec()
    }
}

#[derive(Args)]
struct GenerateTraceArgs {
    #[arg(short, long, value_enum, default_value_t = TracePattern::Sequential)]
    pattern: TracePattern,

    /// Number of accesses
    #[arg(short, long, default_value_t = 1000)]
    count: usize,

    #[arg(short, long, default_value = "trace.txt")]
    output: PathBuf,

    /// Seed for the random pattern
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Result table (CSV)
    #[arg(short, long, default_value = "experiment_results.csv")]
    input: PathBuf,

    /// Chart image; `.svg` selects SVG output, anything else PNG
    #[arg(short, long, default_value = "cache_simulation_results.png")]
    output: PathBuf,

    /// Skip chart rendering
    #[arg(long)]
    no_plot: bool,

    /// Leave the FIFO companion series off the size sweeps
    #[arg(long)]
    no_fifo: bool,

    /// Cache size held fixed by the line size, associativity and policy charts
    #[arg(long, default_value_t = 1024)]
    base_cache_size: u64,

    /// Line size held fixed by the cache size, associativity and policy charts
    #[arg(long, default_value_t = 32)]
    base_line_size: u64,
}

#[derive(Args)]
struct QueryArgs {
    /// Result table (CSV)
    #[arg(short, long, default_value = "experiment_results.csv")]
    input: PathBuf,

    /// Field plotted along the x axis
    #[arg(long)]
    vary: Field,

    /// Fixed constraint such as `LineSize=32`; repeatable
    #[arg(long = "where", value_name = "FIELD=VALUE", value_parser = parse_constraint)]
    constraints: Vec<(Field, FieldValue)>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli.command) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level),
    );
    builder
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Simulate(args) => simulate(&args),
        Command::GenerateTrace(args) => generate_trace(&args),
        Command::Analyze(args) => analyze(&args),
        Command::Query(args) => query(args),
    }
}

fn simulate(args: &SimulateArgs) -> Result<()> {
    let trace = TraceFile::load(&args.trace)?;
    info!(
        "Loaded {} accesses from {}",
        trace.entries.len(),
        trace.name
    );
    let scenarios = scenarios(&args.sweep());
    let table = run_scenarios(&trace, &scenarios);
    table.save(&args.output)?;
    println!(
        "Experiments complete! {} results saved to {}",
        table.len(),
        args.output.display()
    );
    Ok(())
}

fn generate_trace(args: &GenerateTraceArgs) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let trace = trace::generate(args.pattern, args.count, &mut rng);
    trace.save(&args.output)?;
    println!(
        "Generated {} with {} {} memory accesses",
        args.output.display(),
        trace.entries.len(),
        trace.name
    );
    Ok(())
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    let table = ResultTable::load(&args.input)?;
    info!(
        "Loaded {} result rows from {}",
        table.len(),
        args.input.display()
    );

    let baseline = ChartBaseline {
        cache_size: args.base_cache_size,
        line_size: args.base_line_size,
        companion_policy: if args.no_fifo {
            None
        } else {
            ChartBaseline::default().companion_policy
        },
        ..ChartBaseline::default()
    };
    let charts: Vec<_> = standard_charts(&baseline)
        .iter()
        .map(|spec| spec.build(&table))
        .collect();
    for chart in &charts {
        println!("\n{chart}");
    }

    if !args.no_plot {
        render::render_dashboard(&args.output, &charts)?;
        println!("Plots saved to '{}'", args.output.display());
    }

    let summary = summary::summarize(&table)
        .with_context(|| format!("No experiments in {}", args.input.display()))?;
    println!("\n{}", "=".repeat(70));
    println!("EXPERIMENT SUMMARY STATISTICS");
    println!("{}", "=".repeat(70));
    println!("\n{summary}");
    Ok(())
}

fn query(args: QueryArgs) -> Result<()> {
    let table = ResultTable::load(&args.input)?;
    let fixed: Constraints = args.constraints.into_iter().collect();
    let points = build_series(&table, &fixed, args.vary, &args.vary.default_order());
    println!("{} series for [{fixed}]", args.vary);
    if points.is_empty() {
        println!("  (no matching results)");
    }
    for point in &points {
        println!("  {point}");
    }
    Ok(())
}
