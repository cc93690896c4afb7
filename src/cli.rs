use crate::batch::{BatchDriver, HtmlFileSink};
use crate::catalog::{BundledCatalog, CatalogSource, FileCatalog};
use crate::config::{ResolvedConfig, RunFile, RunMode};
use crate::constants::REGION_HELP_TEXT;
use crate::driver::ChromiumFactory;
use crate::errors::{AppError, AppResult};
use crate::models::Outcome;
use crate::post_process::{count_data_points, folder_stats, format_folder};
use crate::template::resolve;
use crate::ui::ConsoleReporter;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;

// CLI metadata constants
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
const APP_ABOUT: &str = env!("CARGO_PKG_DESCRIPTION");

/// A download job, from CLI arguments or a run file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Single {
        indicator: String,
        region: String,
    },
    Region {
        region: String,
    },
    Indicator {
        indicator: String,
        start: Option<String>,
        end: Option<String>,
    },
    Range {
        start: Option<String>,
        end: Option<String>,
    },
    All {
        start: Option<String>,
    },
}

impl Job {
    /// Builds the job a validated run file describes.
    pub fn from_run_file(run: &RunFile) -> AppResult<Self> {
        let required = |value: &Option<String>, key: &str| -> AppResult<String> {
            value
                .clone()
                .ok_or_else(|| AppError::InvalidInput(format!("Run file requires '{key}'")))
        };

        Ok(match run.mode {
            RunMode::Single => Job::Single {
                indicator: required(&run.indicator, "indicator")?,
                region: required(&run.region, "region")?,
            },
            RunMode::Region => Job::Region {
                region: required(&run.region, "region")?,
            },
            RunMode::Indicator => Job::Indicator {
                indicator: required(&run.indicator, "indicator")?,
                start: run.start.clone(),
                end: run.end.clone(),
            },
            RunMode::Range => Job::Range {
                start: run.start.clone(),
                end: run.end.clone(),
            },
            RunMode::All => Job::All {
                start: run.start.clone(),
            },
        })
    }
}

fn indicator_arg() -> Arg<'static> {
    Arg::new("indicator")
        .short('i')
        .long("indicator")
        .help("Indicator name as listed in the catalog (e.g., street_network)")
        .required(true)
        .action(ArgAction::Set)
}

fn region_arg() -> Arg<'static> {
    Arg::new("region")
        .short('r')
        .long("region")
        .help(REGION_HELP_TEXT)
        .required(true)
        .action(ArgAction::Set)
}

fn start_arg() -> Arg<'static> {
    Arg::new("start")
        .short('s')
        .long("start")
        .help("First region of the range (defaults to the first catalog region)")
        .action(ArgAction::Set)
}

fn end_arg() -> Arg<'static> {
    Arg::new("end")
        .short('e')
        .long("end")
        .help("Last region of the range, inclusive (defaults to the last catalog region)")
        .action(ArgAction::Set)
}

fn dir_arg() -> Arg<'static> {
    Arg::new("dir")
        .help("Folder with saved {region}_{indicator}.html tables")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
}

/// Builds the command-line definition.
pub fn build_command() -> Command<'static> {
    Command::new("census2010")
        .version(APP_VERSION)
        .author(APP_AUTHOR)
        .about(APP_ABOUT)
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .help("Catalog TOML file (defaults to the bundled catalog)")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Folder for saved tables")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("chrome")
                .long("chrome")
                .help("Path to the Chromium executable")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("headed")
                .long("headed")
                .help("Show the browser window")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("single")
                .about("Download one indicator for one region")
                .arg(indicator_arg())
                .arg(region_arg()),
        )
        .subcommand(
            Command::new("region")
                .about("Download every indicator for one region")
                .arg(region_arg()),
        )
        .subcommand(
            Command::new("indicator")
                .about("Download one indicator across a region range")
                .after_help("Example:\n  census2010 indicator -i doctors -s 01 -e 20")
                .arg(indicator_arg())
                .arg(start_arg())
                .arg(end_arg()),
        )
        .subcommand(
            Command::new("range")
                .about("Download every indicator across a region range")
                .arg(start_arg())
                .arg(end_arg()),
        )
        .subcommand(
            Command::new("all")
                .about("Download every indicator for every region, optionally from a start region")
                .arg(start_arg()),
        )
        .subcommand(
            Command::new("toml")
                .about("Run using a TOML run file")
                .arg(
                    Arg::new("config")
                        .help("Path to the TOML run file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("template")
                .about("Print the resolved form template for an indicator and region")
                .arg(indicator_arg())
                .arg(region_arg()),
        )
        .subcommand(
            Command::new("format")
                .about("Wrap saved raw tables into viewable HTML documents")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("stats")
                .about("Count data rows in saved tables")
                .arg(dir_arg()),
        )
}

/// Parses command-line arguments and executes the requested command.
///
/// Download commands launch one Chromium session per attempt, save successful
/// tables to the output folder, and log a summary. Individual download
/// failures are logged, not returned.
///
/// # Errors
///
/// Returns an error if:
/// - The catalog or run file cannot be read or is invalid
/// - An indicator or region is not in the catalog
/// - A post-processing folder cannot be read or written
pub async fn cli() -> AppResult<()> {
    let cmd = build_command();
    let mut cmd_for_help = cmd.clone();
    let matches = cmd.get_matches();

    match matches.subcommand() {
        Some(("toml", sub)) => {
            let config_path = sub
                .get_one::<PathBuf>("config")
                .ok_or_else(|| AppError::InvalidInput("config is required".into()))?;
            let run = RunFile::from_toml_file(config_path)?;
            let mut config = run.settings.clone();
            apply_overrides(&mut config, sub);
            run_job(Job::from_run_file(&run)?, &config).await
        }
        Some(("template", sub)) => {
            let config = config_from(sub);
            print_template(&config, arg(sub, "indicator")?, arg(sub, "region")?)
        }
        Some(("format", sub)) => {
            let dir = dir(sub)?;
            let formatted = format_folder(&dir)?;
            println!("Formatted {formatted} table(s) in {}", dir.display());
            Ok(())
        }
        Some(("stats", sub)) => {
            for stats in folder_stats(&dir(sub)?)? {
                println!("{}\t{}\t{}", stats.region, stats.indicator, stats.data_points);
            }
            Ok(())
        }
        Some((name, sub)) => {
            let job = job_from_args(name, sub)?;
            run_job(job, &config_from(sub)).await
        }
        None => cmd_for_help
            .print_help()
            .map_err(|e| AppError::IoError(format!("Failed to print help: {e}"))),
    }
}

fn job_from_args(name: &str, sub: &ArgMatches) -> AppResult<Job> {
    let optional = |key: &str| sub.get_one::<String>(key).cloned();
    Ok(match name {
        "single" => Job::Single {
            indicator: arg(sub, "indicator")?.to_string(),
            region: arg(sub, "region")?.to_string(),
        },
        "region" => Job::Region {
            region: arg(sub, "region")?.to_string(),
        },
        "indicator" => Job::Indicator {
            indicator: arg(sub, "indicator")?.to_string(),
            start: optional("start"),
            end: optional("end"),
        },
        "range" => Job::Range {
            start: optional("start"),
            end: optional("end"),
        },
        "all" => Job::All {
            start: optional("start"),
        },
        other => {
            return Err(AppError::InvalidInput(format!(
                "Unknown command: {other}"
            )))
        }
    })
}

fn arg<'a>(sub: &'a ArgMatches, key: &str) -> AppResult<&'a str> {
    sub.get_one::<String>(key)
        .map(String::as_str)
        .ok_or_else(|| AppError::InvalidInput(format!("--{key} is required")))
}

fn dir(sub: &ArgMatches) -> AppResult<PathBuf> {
    sub.get_one::<PathBuf>("dir")
        .cloned()
        .ok_or_else(|| AppError::InvalidInput("dir is required".into()))
}

fn config_from(sub: &ArgMatches) -> ResolvedConfig {
    let mut config = ResolvedConfig::default();
    apply_overrides(&mut config, sub);
    config
}

/// Applies the global command-line options on top of `config`.
fn apply_overrides(config: &mut ResolvedConfig, sub: &ArgMatches) {
    if let Some(path) = sub.get_one::<PathBuf>("catalog") {
        config.catalog_path = Some(path.clone());
    }
    if let Some(dir) = sub.get_one::<PathBuf>("output") {
        config.output_dir = dir.clone();
    }
    if let Some(path) = sub.get_one::<PathBuf>("chrome") {
        config.chrome_path = Some(path.clone());
    }
    if sub.get_one::<bool>("headed").copied().unwrap_or(false) {
        config.headless = false;
    }
}

fn catalog_source(config: &ResolvedConfig) -> Box<dyn CatalogSource> {
    match &config.catalog_path {
        Some(path) => Box::new(FileCatalog::new(path)),
        None => Box::new(BundledCatalog),
    }
}

async fn run_job(job: Job, config: &ResolvedConfig) -> AppResult<()> {
    config.validate()?;

    let factory = ChromiumFactory::new(
        config.chrome_path.clone(),
        config.headless,
        config.implicit_wait_ms,
    );
    let mut batch = BatchDriver::new(
        factory,
        catalog_source(config),
        HtmlFileSink::new(&config.output_dir),
        ConsoleReporter::new(),
        config.base_url.as_str(),
    );

    info!(
        headless = config.headless,
        output_dir = %config.output_dir.display(),
        "Starting downloads"
    );

    match job {
        Job::Single { indicator, region } => {
            let outcome = batch.download_single(&indicator, &region).await?;
            if let Outcome::Success(markup) = &outcome {
                let data_points = count_data_points(markup);
                info!(region = %region, indicator = %indicator, data_points, "Success {data_points} dp.");
            }
        }
        Job::Region { region } => {
            batch.download_region(&region).await?;
        }
        Job::Indicator {
            indicator,
            start,
            end,
        } => {
            batch
                .download_indicator(&indicator, start.as_deref(), end.as_deref())
                .await?;
        }
        Job::Range { start, end } => {
            let summary = batch
                .download_range(start.as_deref(), end.as_deref())
                .await?;
            info!(
                attempts = summary.attempts(),
                failed = summary.failed.len(),
                skipped_regions = summary.region_errors.len(),
                "Range completed"
            );
        }
        Job::All { start } => {
            let summary = batch.download_all(start.as_deref()).await?;
            info!(
                attempts = summary.attempts(),
                failed = summary.failed.len(),
                skipped_regions = summary.region_errors.len(),
                "All regions completed"
            );
        }
    }

    Ok(())
}

fn print_template(config: &ResolvedConfig, indicator: &str, region: &str) -> AppResult<()> {
    let catalog = catalog_source(config).fetch()?;
    let resolved = resolve(&catalog, indicator, region)?;
    let id = catalog
        .indicator(indicator)
        .map(|definition| definition.id)
        .ok_or_else(|| AppError::UnknownIndicator(indicator.to_string()))?;

    println!("indicator: {indicator} ({id})");
    println!("region: {region}");
    println!("available: {}", if resolved.available { "yes" } else { "no" });
    for (field, value) in resolved.template.iter() {
        println!("  {field} = {value}");
    }
    Ok(())
}
