//! casechain: link labour-court decisions across instances and report on
//! the resulting case chains.

mod display;
mod load;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use casechain_core::{
    AnalysisConfig, AppealReport, CaseSummary, DatasetProfile, DecisionRecord, LinkSummary,
    Linkage, OutcomeDistribution, PatternReport, aggregate, aggregate_cases, analyze_appeals,
    link_with_config, profile, validate_with_config,
};

#[derive(Parser)]
#[command(name = "casechain")]
#[command(version, about = "Link labour-court decisions across instances")]
struct Cli {
    /// Decision collection (JSON array, or object with a `decisions` array)
    #[arg(short, long, env = "CASECHAIN_INPUT", global = true)]
    input: Option<PathBuf>,

    /// Analysis settings (TOML)
    #[arg(short, long, env = "CASECHAIN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Rows kept in top-N views (overrides config file)
    #[arg(long, global = true)]
    top: Option<usize>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Group decisions into cases and summarise the linkage
    Link,
    /// Audit process-number patterns across instances
    Validate,
    /// Outcome distributions by instance and by tribunal
    Outcomes {
        /// Only decisions of cases present at all three instances
        #[arg(long)]
        complete_only: bool,
    },
    /// Appellant success rates and reversals along case chains
    Appeals,
    /// Field frequencies of the collection
    Profile,
    /// Every report in sequence
    Report,
}

#[derive(Serialize)]
struct LinkOutput {
    summary: LinkSummary,
    largest_cases: Vec<CaseSummary>,
}

#[derive(Serialize)]
struct FullReport {
    link: LinkOutput,
    validation: PatternReport,
    outcomes: OutcomeDistribution,
    appeals: AppealReport,
    profile: DatasetProfile,
}

fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("casechain=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = load::load_config(cli.config.as_deref())?;
    if let Some(top) = cli.top {
        config.top_n = top;
    }
    config.validate()?;

    let input = cli
        .input
        .context("no decision collection given: pass --input or set CASECHAIN_INPUT")?;
    let records = load::load_records(&input)?;
    info!(path = %input.display(), records = records.len(), "casechain v{}", env!("CARGO_PKG_VERSION"));

    run(cli.command, &records, &config, cli.json)
}

fn run(
    command: Command,
    records: &[DecisionRecord],
    config: &AnalysisConfig,
    json: bool,
) -> anyhow::Result<()> {
    let top_n = config.top_n;
    match command {
        Command::Link => {
            let out = link_output(&link_with_config(records, config), top_n);
            if json {
                print_json(&out)?;
            } else {
                display::print_link_summary(&out.summary, &out.largest_cases);
            }
        }
        Command::Validate => {
            let report = validate_with_config(records, config);
            if json {
                print_json(&report)?;
            } else {
                display::print_pattern_report(&report, top_n);
            }
        }
        Command::Outcomes { complete_only } => {
            let dist = if complete_only {
                aggregate_cases(link_with_config(records, config).complete_cases())
            } else {
                aggregate(records)
            };
            if json {
                print_json(&dist)?;
            } else {
                display::print_outcomes(&dist);
            }
        }
        Command::Appeals => {
            let report = analyze_appeals(link_with_config(records, config).cases());
            if json {
                print_json(&report)?;
            } else {
                display::print_appeals(&report, top_n);
            }
        }
        Command::Profile => {
            let p = profile(records);
            if json {
                print_json(&p)?;
            } else {
                display::print_profile(&p, top_n);
            }
        }
        Command::Report => {
            let linkage = link_with_config(records, config);
            let report = FullReport {
                link: link_output(&linkage, top_n),
                validation: validate_with_config(records, config),
                outcomes: aggregate(records),
                appeals: analyze_appeals(linkage.cases()),
                profile: profile(records),
            };
            if json {
                print_json(&report)?;
            } else {
                display::print_link_summary(&report.link.summary, &report.link.largest_cases);
                display::print_pattern_report(&report.validation, top_n);
                display::print_outcomes(&report.outcomes);
                display::print_appeals(&report.appeals, top_n);
                display::print_profile(&report.profile, top_n);
            }
        }
    }
    Ok(())
}

fn link_output(linkage: &Linkage<'_>, top_n: usize) -> LinkOutput {
    LinkOutput {
        summary: linkage.summary(),
        largest_cases: largest_cases(linkage, top_n),
    }
}

/// Multi-instance cases with the most decisions, ties by key.
fn largest_cases(linkage: &Linkage<'_>, n: usize) -> Vec<CaseSummary> {
    let mut cases: Vec<_> = linkage.multi_instance_cases().collect();
    cases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.key().cmp(b.key())));
    cases.into_iter().take(n).map(|c| c.describe()).collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialising report")?;
    println!("{text}");
    Ok(())
}
