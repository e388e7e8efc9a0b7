mod config;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use extractors::{extract_items, ExtractionOptions};
use rust_decimal::Decimal;
use scheduling::{
    detect_risks, filter_risks, shift_to_business_days, Country, IcsEncoder, RiskType,
};
use serde::Serialize;
use shared_types::{DateLocale, ExtractionResult, Issue, Item, MovedDate, Risk};
use std::path::{Path, PathBuf};

use crate::config::PlanConfig;

#[derive(Parser, Debug)]
#[command(name = "payplan", about = "Turn BNPL payment notifications into a checked payment calendar")]
struct Cli {
    /// Config file (defaults to <config dir>/payplan/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract payment items and print them as JSON
    Extract(ExtractArgs),
    /// Extract, shift to business days, detect risks and optionally write an ICS file
    Plan(PlanArgs),
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Text files; blocks inside a file are separated by a line of `---`
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// IANA timezone for date interpretation
    #[arg(long)]
    tz: Option<String>,

    /// Slash-date ordering: us (M/D/Y) or eu (D/M/Y)
    #[arg(long)]
    locale: Option<DateLocale>,
}

#[derive(Args, Debug)]
struct PlanArgs {
    #[command(flatten)]
    extract: ExtractArgs,

    /// Holiday calendar: US, GB, CA or None
    #[arg(long)]
    country: Option<Country>,

    /// Keep provider due dates even when they fall on non-business days
    #[arg(long)]
    no_business_days: bool,

    /// Extra non-business day (YYYY-MM-DD), repeatable
    #[arg(long = "skip-date", value_name = "DATE")]
    skip_dates: Vec<String>,

    /// Payday (YYYY-MM-DD), repeatable
    #[arg(long = "payday", value_name = "DATE")]
    paydays: Vec<String>,

    /// Cash to keep in reserve around each payday
    #[arg(long)]
    min_buffer: Option<Decimal>,

    /// Report only these risk types, repeatable
    #[arg(long = "risk-type", value_name = "TYPE")]
    risk_types: Vec<RiskType>,

    /// Write the calendar to this path
    #[arg(long, value_name = "PATH")]
    ics: Option<PathBuf>,

    /// Write the calendar base64 encoded
    #[arg(long, requires = "ics")]
    base64: bool,
}

#[derive(Debug, Serialize)]
struct PlanReport {
    items: Vec<Item>,
    issues: Vec<Issue>,
    duplicates_removed: u32,
    date_locale: DateLocale,
    suspicious_items: Vec<usize>,
    moved_dates: Vec<MovedDate>,
    risks: Vec<Risk>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (config, config_path) =
        PlanConfig::load(cli.config.as_deref()).context("Failed to load payplan config")?;
    tracing::debug!(path = %config_path.display(), "Loaded config");

    let output = match cli.command {
        Command::Extract(args) => {
            let result = run_extract(&args, &config)?;
            serde_json::to_string_pretty(&result)?
        }
        Command::Plan(args) => {
            let report = run_plan(&args, &config)?;
            serde_json::to_string_pretty(&report)?
        }
    };

    println!("{output}");
    Ok(())
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_extract(args: &ExtractArgs, config: &PlanConfig) -> Result<ExtractionResult> {
    let blocks = read_blocks(&args.files)?;
    let tz = args.tz.as_deref().unwrap_or(&config.timezone);

    let options = ExtractionOptions {
        date_locale: match args.locale {
            Some(locale) => Some(locale),
            None => config.date_locale()?,
        },
        now: Some(Utc::now()),
    };

    Ok(extract_items(&blocks, tz, &options))
}

fn run_plan(args: &PlanArgs, config: &PlanConfig) -> Result<PlanReport> {
    let extracted = run_extract(&args.extract, config)?;
    let tz = args.extract.tz.as_deref().unwrap_or(&config.timezone);

    let mut business_days = config.business_days()?;
    if let Some(country) = args.country {
        business_days.country = country;
    }
    if args.no_business_days {
        business_days.business_day_mode = false;
    }
    business_days.custom_skip_dates.extend(args.skip_dates.iter().cloned());

    let (items, moved_dates) = shift_to_business_days(&extracted.items, tz, &business_days);

    let paydays = if args.paydays.is_empty() {
        &config.paydays
    } else {
        &args.paydays
    };
    let min_buffer = args.min_buffer.unwrap_or(config.min_buffer);
    let risks = detect_risks(&items, paydays, min_buffer, tz);

    let allowed = if args.risk_types.is_empty() {
        config.risk_types()?
    } else {
        Some(args.risk_types.clone())
    };
    let risks = match allowed {
        Some(allowed) => filter_risks(risks, &allowed),
        None => risks,
    };

    if let Some(path) = &args.ics {
        write_calendar(path, &items, &risks, tz, args.base64)?;
    }

    tracing::info!(
        items = items.len(),
        issues = extracted.issues.len(),
        moved = moved_dates.len(),
        risks = risks.len(),
        "Plan complete"
    );

    Ok(PlanReport {
        items,
        issues: extracted.issues,
        duplicates_removed: extracted.duplicates_removed,
        date_locale: extracted.date_locale,
        suspicious_items: extracted.suspicious_items,
        moved_dates,
        risks,
    })
}

fn write_calendar(path: &Path, items: &[Item], risks: &[Risk], tz: &str, base64: bool) -> Result<()> {
    let encoder = IcsEncoder::new(tz);
    let bytes = if base64 {
        encoder.encode_base64(items, risks).into_bytes()
    } else {
        encoder.encode(items, risks)
    };

    std::fs::write(path, bytes).with_context(|| format!("Failed to write calendar to {:?}", path))?;
    tracing::info!(path = %path.display(), "Wrote calendar");
    Ok(())
}

fn read_blocks(files: &[PathBuf]) -> Result<Vec<String>> {
    let mut blocks = Vec::new();
    for path in files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        blocks.extend(split_blocks(&content));
    }
    Ok(blocks)
}

/// Split a file into text blocks on lines consisting only of `---`
fn split_blocks(content: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim() == "---" {
            blocks.push(current.join("\n"));
            current.clear();
        } else {
            current.push(line);
        }
    }
    blocks.push(current.join("\n"));

    blocks
        .into_iter()
        .filter(|block| !block.trim().is_empty())
        .collect()
}
