use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use courier_ledger::aggregate::{
    aggregate_with_policy, daily_rows, evaluate_incentives, resolve_range, DailyRow, Period,
    PeriodPreset,
};
use courier_ledger::config::{Config, ConfigOverrides};
use courier_ledger::engine::policy::NegativePolicy;
use courier_ledger::output::csv::{daily_rows_to_csv, query_to_csv};
use courier_ledger::output::json::{daily_rows_to_json, render_json};
use courier_ledger::output::table::{
    render_catalog_table, render_daily_table, render_day_report, render_incentive_table,
    render_presets_table, render_query_table,
};
use courier_ledger::report::{
    all_presets, catalog, catalog_for, day_report, find_preset, report_for, DayReport, MetricGroup,
    MetricId, Query,
};
use courier_ledger::server::run_server;
use courier_ledger::snapshot::{SnapshotStore, SourceStore};
use courier_ledger::source::conversion::{apply_conversion, ConversionDirection};
use courier_ledger::source::{coalesce_to_zero, LogEntry, LogKind};
use courier_ledger::types::{Route, RouteScope, Stage};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    /// General to standalone
    GenToSolo,
    /// Standalone to general
    SoloToGen,
}

impl From<Direction> for ConversionDirection {
    fn from(value: Direction) -> Self {
        match value {
            Direction::GenToSolo => Self::GeneralToStandalone,
            Direction::SoloToGen => Self::StandaloneToGeneral,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "courier-ledger",
    about = "Daily gift, return and fresh-bag ledger for a two-route courier"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    db: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Floor negative derived values at zero
    #[arg(long)]
    clamp: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct PeriodArgs {
    /// today, week, settlement or custom
    #[arg(long)]
    period: Option<PeriodPreset>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl PeriodArgs {
    fn period(&self) -> Option<Period> {
        match (self.period, self.from, self.to) {
            (None, None, None) => None,
            (Some(PeriodPreset::Custom), start, end) | (None, start, end) => {
                Some(Period::custom(start, end))
            }
            (Some(preset), _, _) => Some(Period::preset(preset)),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show one day's entries and derived values
    Day {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record stage values as NAME=VALUE; an empty value clears the field
    Set {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        stage: Option<Stage>,
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    /// Record a fresh-bag category conversion
    Convert {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(value_enum)]
        direction: Direction,
        quantity: u32,
    },
    /// Append a side-log entry
    Log {
        #[arg(long)]
        date: Option<NaiveDate>,
        kind: LogKind,
        route: Route,
        quantity: u32,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Remove every entry for a day
    Delete {
        #[arg(long)]
        date: NaiveDate,
    },
    Query {
        /// Named preset; explicit flags override its fields
        #[arg(long)]
        preset: Option<String>,
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long)]
        route: Option<RouteScope>,
        #[arg(long, value_delimiter = ',')]
        metrics: Vec<MetricId>,
        /// Also print the incentive evaluation
        #[arg(long)]
        incentives: bool,
    },
    /// List the metric catalog
    Metrics {
        #[arg(long)]
        group: Option<MetricGroup>,
    },
    Presets,
    /// Per-day rows for a period
    Export {
        #[command(flatten)]
        period: PeriodArgs,
    },
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 3001)]
        port: u16,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        db_path: cli.db.clone(),
        negative_policy: cli.clamp.then_some(NegativePolicy::Clamp),
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let store = SnapshotStore::open(&config.resolved_db_path())?;
    let today = Local::now().date_naive();

    match &cli.command {
        Commands::Day { date } => {
            let date = date.unwrap_or(today);
            let raw = store.load(date)?.unwrap_or_default();
            print_day(&day_report(date, raw, &config), cli.output)?;
        }
        Commands::Set {
            date,
            stage,
            assignments,
        } => {
            let date = date.unwrap_or(today);
            let mut raw = store.load(date)?.unwrap_or_default();
            for assignment in assignments {
                raw.apply_assignment(*stage, assignment)
                    .with_context(|| format!("rejected assignment {assignment}"))?;
            }
            store.save(date, &raw)?;
            info!(%date, fields = assignments.len(), "recorded stage values");
            print_day(&day_report(date, raw, &config), cli.output)?;
        }
        Commands::Convert {
            date,
            direction,
            quantity,
        } => {
            let date = date.unwrap_or(today);
            let mut raw = store.load(date)?.unwrap_or_default();
            let balance = apply_conversion(&mut raw, (*direction).into(), *quantity)?;
            store.save(date, &raw)?;
            info!(
                %date,
                general = balance.general,
                standalone = balance.standalone,
                "recorded fresh-bag conversion"
            );
            print_day(&day_report(date, raw, &config), cli.output)?;
        }
        Commands::Log {
            date,
            kind,
            route,
            quantity,
            reason,
        } => {
            let date = date.unwrap_or(today);
            let entry = LogEntry::new(*route, reason.as_str(), *quantity);
            let raw = store.append_log(date, *kind, entry)?;
            info!(%date, kind = %kind, route = %route, quantity, "appended log entry");
            print_day(&day_report(date, raw, &config), cli.output)?;
        }
        Commands::Delete { date } => {
            if store.delete(*date)? {
                println!("Removed entries for {date}");
            } else {
                println!("No entries recorded for {date}");
            }
        }
        Commands::Query {
            preset,
            period,
            route,
            metrics,
            incentives,
        } => {
            let mut query = match preset {
                Some(name) => find_preset(name, &config.presets)
                    .map(|preset| preset.query())
                    .ok_or_else(|| anyhow!("unknown preset: {name}"))?,
                None => Query::default(),
            };
            if let Some(period) = period.period() {
                query.period = period;
            }
            if let Some(route) = route {
                query.route = *route;
            }
            if !metrics.is_empty() {
                query.metrics = metrics.clone();
            }

            let range = resolve_range(&query.period, today, &config.settlement);
            let days = store.load_range(range.start, range.end)?;
            let aggregate =
                aggregate_with_policy(&days, range, &config.rates, config.engine.negative_policy);
            let report = report_for(&query, &aggregate, range, &config);
            match cli.output {
                OutputFormat::Table => println!("{}", render_query_table(&report)),
                OutputFormat::Json => println!("{}", render_json(&report)?),
                OutputFormat::Csv => print!("{}", query_to_csv(&report)?),
            }
            if *incentives {
                let evaluation = evaluate_incentives(&aggregate, &config.incentive);
                match cli.output {
                    OutputFormat::Table => println!("{}", render_incentive_table(&evaluation)),
                    OutputFormat::Json | OutputFormat::Csv => {
                        println!("{}", render_json(&evaluation)?)
                    }
                }
            }
        }
        Commands::Metrics { group } => {
            let defs = match group {
                Some(group) => catalog_for(*group),
                None => catalog(),
            };
            match cli.output {
                OutputFormat::Table | OutputFormat::Csv => {
                    println!("{}", render_catalog_table(&defs))
                }
                OutputFormat::Json => println!("{}", render_json(&defs)?),
            }
        }
        Commands::Presets => {
            let presets = all_presets(&config.presets);
            match cli.output {
                OutputFormat::Table | OutputFormat::Csv => {
                    println!("{}", render_presets_table(&presets))
                }
                OutputFormat::Json => println!("{}", render_json(&presets)?),
            }
        }
        Commands::Export { period } => {
            let period = period
                .period()
                .unwrap_or_else(|| Period::preset(PeriodPreset::Settlement));
            let range = resolve_range(&period, today, &config.settlement);
            let days = store.load_range(range.start, range.end)?;
            let rows = daily_rows(&days, range, &config.rates);
            info!(range = %range, days = rows.len(), "exporting daily rows");
            match cli.output {
                OutputFormat::Table => println!("{}", render_daily_table(&rows)),
                OutputFormat::Json => println!("{}", daily_rows_to_json(range, &rows)?),
                OutputFormat::Csv => print!("{}", daily_rows_to_csv(&rows)?),
            }
        }
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

fn print_day(report: &DayReport, output: OutputFormat) -> Result<()> {
    for anomaly in &report.anomalies {
        warn!(date = %report.date, "{anomaly}");
    }
    if let Some(mismatch) = &report.partition_mismatch {
        warn!(date = %report.date, "{mismatch}");
    }
    match output {
        OutputFormat::Table => println!(
            "{}",
            render_day_report(
                &report.source,
                &report.derived,
                &report.anomalies,
                report.partition_mismatch.as_ref(),
            )
        ),
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => {
            let row = DailyRow {
                date: report.date,
                raw: report.source.clone(),
                source: coalesce_to_zero(&report.source),
                derived: report.derived,
            };
            print!("{}", daily_rows_to_csv(&[row])?);
        }
    }
    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &PathBuf) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}
