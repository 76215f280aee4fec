use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;

use slot_checker::models::SourceSystem;
use slot_checker::{CheckOrchestrator, CheckerConfig, FileGridSource};

const USAGE: &str =
    "usage: check-slots <config.toml> <grid-dir> [--system dent-sys|stransa|all] [--date YYYY-MM-DD]";

// ========================================
// Arguments
// ========================================

struct Args {
    config: PathBuf,
    grid_dir: PathBuf,
    system: Option<SourceSystem>,
    date: Option<NaiveDate>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut system = None;
    let mut date = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--system" => {
                let value = args.next().context("--system needs a value")?;
                system = match value.as_str() {
                    "all" => None,
                    other => Some(SourceSystem::parse(other).map_err(anyhow::Error::msg)?),
                };
            }
            "--date" => {
                let value = args.next().context("--date needs a value")?;
                let parsed = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .with_context(|| format!("invalid --date '{}'", value))?;
                date = Some(parsed);
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ => positional.push(arg),
        }
    }

    let [config, grid_dir] = <[String; 2]>::try_from(positional)
        .map_err(|_| anyhow::anyhow!("expected a config file and a grid directory\n{}", USAGE))?;

    Ok(Args {
        config: PathBuf::from(config),
        grid_dir: PathBuf::from(grid_dir),
        system,
        date,
    })
}

// ========================================
// Main
// ========================================

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let config = CheckerConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let date = match args.date {
        Some(date) => date,
        None => Local::now()
            .date_naive()
            .succ_opt()
            .context("cannot compute tomorrow's date")?,
    };

    let clinics = config.enabled_clinics(args.system);
    if clinics.is_empty() {
        bail!("no enabled clinics to check");
    }
    log::info!(
        "{} enabled clinics, grids from {}",
        clinics.len(),
        args.grid_dir.display()
    );

    let orchestrator = CheckOrchestrator::new(Arc::new(config.clone()))
        .with_source(Arc::new(FileGridSource::new(SourceSystem::DentSys, &args.grid_dir)))
        .with_source(Arc::new(FileGridSource::new(SourceSystem::Stransa, &args.grid_dir)));

    let result = orchestrator.run_enabled(args.system, date).await;

    for outcome in &result.outcomes {
        match outcome.as_checked() {
            Some(checked) => {
                let ranges: Vec<String> = checked
                    .staff
                    .iter()
                    .flat_map(|s| {
                        s.qualifying_ranges()
                            .into_iter()
                            .map(move |r| format!("{} {}", s.staff_id, r))
                    })
                    .collect();
                log::info!(
                    "{}: {} / {} blocks{} [{}]",
                    checked.clinic,
                    checked.total_qualifying_blocks,
                    checked.minimum_blocks_required,
                    if checked.shortage { " (shortage)" } else { "" },
                    ranges.join(", ")
                );
            }
            None => {
                if let Some(failure) = outcome.as_failed() {
                    log::warn!("{}: {} {}", failure.clinic, failure.kind, failure.message);
                }
            }
        }
    }

    let json = serde_json::to_string_pretty(&result).context("serializing run result")?;
    println!("{}", json);

    Ok(())
}
