// crates/oeecal/src/main.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use oeecal_core::frames::{aggregates_dataframe, candidates_dataframe, write_parquet};
use oeecal_core::{
    calibrate, component_means, CalibrationOutcome, Dataset, DateRange, GroupBy, KnownReference,
    ReconSettings,
};
use oeecal_parser::{
    decode_export, parse_oee_table, parse_stoppage_log, ParsedOeeTable, ParsedStoppageLog,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Reconcile hourly OEE/TEEP exports with plant dashboard figures",
    long_about = None
)]
struct Cli {
    /// Settings file (TOML). Built-in defaults apply when absent.
    #[arg(long, global = true, env = "OEECAL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of compact text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse the exports and report what was kept and dropped
    Load(InputArgs),
    /// Filter and aggregate OEE/TEEP under the configured rules
    Aggregate(AggregateArgs),
    /// Search the rule grid for the set that best reproduces known dashboard figures
    Calibrate(CalibrateArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Hourly OEE/TEEP export (CSV)
    #[arg(long)]
    oee: PathBuf,

    /// Stoppage log export (CSV)
    #[arg(long)]
    stoppages: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Also write the result frame to this Parquet file
    #[arg(long)]
    parquet: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct AggregateArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long, value_enum, default_value_t = GroupByArg::Shift)]
    group_by: GroupByArg,

    /// First day of the reporting period, inclusive
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// Last day of the reporting period, inclusive
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct CalibrateArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Known dashboard figure, e.g. `shift:A:teep=40.23`. Repeatable; added to the
    /// references in the settings file.
    #[arg(long = "reference", value_name = "SCOPE:METRIC=PCT")]
    references: Vec<KnownReference>,

    /// Number of ranked candidates to print
    #[arg(long, default_value_t = 10)]
    top: usize,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GroupByArg {
    None,
    Shift,
    Machine,
    Day,
    Hour,
    Month,
    DayHour,
}

impl From<GroupByArg> for GroupBy {
    fn from(value: GroupByArg) -> Self {
        match value {
            GroupByArg::None => GroupBy::None,
            GroupByArg::Shift => GroupBy::Shift,
            GroupByArg::Machine => GroupBy::Machine,
            GroupByArg::Day => GroupBy::Day,
            GroupByArg::Hour => GroupBy::Hour,
            GroupByArg::Month => GroupBy::Month,
            GroupByArg::DayHour => GroupBy::DayHour,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Load(args) => run_load(&args, &settings),
        Command::Aggregate(args) => run_aggregate(args, settings),
        Command::Calibrate(args) => run_calibrate(args, &settings),
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn load_settings(path: Option<&Path>) -> Result<ReconSettings> {
    match path {
        Some(path) => {
            let settings = ReconSettings::from_path(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?;
            info!(path = %path.display(), "settings loaded");
            Ok(settings)
        }
        None => Ok(ReconSettings::default()),
    }
}

fn read_export(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(decode_export(&bytes))
}

fn load_sources(
    input: &InputArgs,
    settings: &ReconSettings,
) -> Result<(ParsedOeeTable, Option<ParsedStoppageLog>)> {
    let table = parse_oee_table(&read_export(&input.oee)?, &settings.load)
        .with_context(|| format!("failed to parse OEE export {}", input.oee.display()))?;

    let log = match input.stoppages.as_deref() {
        Some(path) => Some(
            parse_stoppage_log(&read_export(path)?)
                .with_context(|| format!("failed to parse stoppage log {}", path.display()))?,
        ),
        None => None,
    };

    Ok((table, log))
}

fn run_load(args: &InputArgs, settings: &ReconSettings) -> Result<()> {
    let (table, log) = load_sources(args, settings)?;

    println!("{}", args.oee.display());
    println!("{}", render::load_table(table.parser, &table.content_hash, &table.report));
    if let (Some(path), Some(log)) = (args.stoppages.as_deref(), log.as_ref()) {
        println!("{}", path.display());
        println!("{}", render::load_table(log.parser, &log.content_hash, &log.report));
    }

    let components = component_means(&table.records, &settings.eligibility);
    println!("Component means over hour/calendar/shift-eligible records");
    println!("{}", render::components_table(&components));
    Ok(())
}

fn run_aggregate(args: AggregateArgs, mut settings: ReconSettings) -> Result<()> {
    if let (Some(from), Some(to)) = (args.from, args.to) {
        settings.eligibility.period = Some(DateRange::new(from, to)?);
    }
    settings.validate()?;

    let (table, log) = load_sources(&args.input, &settings)?;
    let dataset = Dataset::from_sources(table, log, &settings.eligibility.stoppage_policy);
    let evaluation = dataset.evaluate(&settings.rule_set(), args.group_by.into())?;

    match args.output.format {
        Format::Table => {
            println!("{}", render::aggregates_table(&evaluation.results));
            println!("{}", render::filter_table(&evaluation.filter));
            println!("fingerprint {}", evaluation.fingerprint);
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
    }

    if let Some(path) = args.output.parquet.as_deref() {
        let df = aggregates_dataframe(&evaluation.results)?;
        write_parquet(&df, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), rows = df.height(), "aggregates written");
    }
    Ok(())
}

fn run_calibrate(args: CalibrateArgs, settings: &ReconSettings) -> Result<()> {
    let mut references = settings.calibration.known_references();
    references.extend(args.references);

    let (table, log) = load_sources(&args.input, settings)?;
    let dataset = Dataset::from_sources(table, log, &settings.eligibility.stoppage_policy);
    let outcome = calibrate(
        &dataset,
        &references,
        &settings.rule_set(),
        &settings.calibration,
    )?;

    match (args.output.format, &outcome) {
        (Format::Json, _) => println!("{}", serde_json::to_string_pretty(&outcome)?),
        (Format::Table, CalibrationOutcome::NotPerformed { rules }) => {
            println!("No reference values given; calibration not performed.");
            println!("{}", render::rules_table(rules));
        }
        (Format::Table, CalibrationOutcome::Calibrated(report)) => {
            println!("{}", render::candidates_table(&report.candidates, args.top));
            println!("Best candidate #{} (grid index {})", report.best.rank, report.best.index);
            println!("{}", render::rules_table(&report.best.rules));
            println!("{}", render::deltas_table(&report.best.deltas));
            println!("{}", render::status_line(report));
            println!("fingerprint {}", report.best.fingerprint);
        }
    }

    if let (Some(path), Some(report)) = (args.output.parquet.as_deref(), outcome.report()) {
        let df = candidates_dataframe(&report.candidates)?;
        write_parquet(&df, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), rows = df.height(), "candidates written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn calibrate_accepts_repeated_references() {
        let cli = Cli::try_parse_from([
            "oeecal",
            "calibrate",
            "--oee",
            "export.csv",
            "--reference",
            "shift:A:teep=40.23",
            "--reference",
            "shift:B:teep=42,19",
            "--top",
            "5",
        ])
        .expect("arguments should parse");

        match cli.command {
            Command::Calibrate(args) => {
                assert_eq!(args.references.len(), 2);
                assert_eq!(args.top, 5);
                assert_eq!(args.output.format, Format::Table);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn aggregate_period_needs_both_ends() {
        let err = Cli::try_parse_from([
            "oeecal",
            "aggregate",
            "--oee",
            "export.csv",
            "--from",
            "2026-02-01",
        ]);
        assert!(err.is_err());

        let cli = Cli::try_parse_from([
            "oeecal",
            "aggregate",
            "--oee",
            "export.csv",
            "--group-by",
            "day-hour",
            "--from",
            "2026-02-01",
            "--to",
            "2026-02-11",
            "--format",
            "json",
        ])
        .expect("arguments should parse");
        match cli.command {
            Command::Aggregate(args) => {
                assert_eq!(GroupBy::from(args.group_by), GroupBy::DayHour);
                assert_eq!(args.from, NaiveDate::from_ymd_opt(2026, 2, 1));
                assert_eq!(args.output.format, Format::Json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn bad_reference_is_rejected_by_the_parser() {
        let result = Cli::try_parse_from([
            "oeecal",
            "calibrate",
            "--oee",
            "export.csv",
            "--reference",
            "shift:C:teep=40",
        ]);
        assert!(result.is_err());
    }
}
