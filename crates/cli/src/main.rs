// ABOUTME: CLI for scraping labelled URLs with the sitescrape site profiles.
// ABOUTME: Runs a sequential batch, an offline HTML extraction or a page probe and prints JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use serde_json::{json, Map, Value};
use sitescrape::{
    default_targets, load_registry_from_path, Client, Report, ScrapeOutcome, Target,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Scrape structured records from known site layouts and output JSON.
#[derive(Parser, Debug)]
#[command(name = "sitescrape")]
#[command(about = "Scrape structured records from known site layouts", long_about = None)]
struct Args {
    /// Targets as LABEL=URL, or a bare URL that doubles as its label.
    targets: Vec<Target>,

    /// Run the built-in demonstration targets.
    #[arg(long, default_value_t = false)]
    demo: bool,

    /// Only check that each target is reachable and summarize the page.
    #[arg(long, default_value_t = false)]
    probe: bool,

    /// HTML file to extract instead of fetching (requires --url).
    #[arg(long, requires = "url", conflicts_with_all = ["targets", "demo", "probe"])]
    html: Option<PathBuf>,

    /// URL the --html file was downloaded from; selects the profile.
    #[arg(long, requires = "html")]
    url: Option<String>,

    /// JSON file with site profiles replacing the built-in ones.
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Pause between consecutive fetches, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    delay_ms: u64,

    /// Per-request timeout, in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Output file path (default: stdout).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Output compact JSON instead of pretty.
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, default_value_t = false, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let log_level = if args.quiet {
        Level::WARN
    } else {
        match args.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut builder = Client::builder()
        .delay(Duration::from_millis(args.delay_ms))
        .timeout(Duration::from_secs(args.timeout_secs));
    if let Some(path) = &args.profiles {
        builder = builder.registry(load_registry_from_path(path)?);
    }
    let client = builder.build()?;

    if let (Some(html_path), Some(url)) = (&args.html, &args.url) {
        let html = fs::read_to_string(html_path)
            .with_context(|| format!("reading {}", html_path.display()))?;
        let mut report = Report::new();
        let outcome = match client.scrape_html(&html, url) {
            Ok(record) => ScrapeOutcome::Success(record),
            Err(err) => ScrapeOutcome::failure(url, url, &err),
        };
        report.record(url, outcome);
        return finish(&report, &args);
    }

    let mut targets = if args.demo {
        default_targets()
    } else {
        Vec::new()
    };
    targets.extend(args.targets.iter().cloned());
    if targets.is_empty() {
        bail!("at least one target is required, or use --demo or --html with --url");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, skipping remaining targets");
            on_signal.cancel();
        }
    });

    if args.probe {
        return probe_all(&client, &targets, &cancel, &args).await;
    }

    info!(
        targets = targets.len(),
        delay_ms = args.delay_ms,
        "starting batch"
    );
    let report = client.run_with_cancellation(&targets, &cancel).await;
    finish(&report, &args)
}

/// Logs the run summary, writes the report and picks the exit status.
fn finish(report: &Report, args: &Args) -> Result<ExitCode> {
    for (label, outcome) in report.iter() {
        match outcome {
            ScrapeOutcome::Success(record) => {
                let size = serde_json::to_string(record).map(|s| s.len()).unwrap_or(0);
                info!(
                    "{}: ok, profile {}, {} fields, {} characters of data",
                    label,
                    record.profile,
                    record.populated_fields(),
                    size
                );
            }
            ScrapeOutcome::Failure { error, .. } => warn!("{}: failed: {}", label, error),
        }
    }
    info!(
        "scraped {} of {} targets",
        report.successes(),
        report.len()
    );

    let json = to_json(report, args.compact)?;
    write_output(&json, args.output.as_deref())?;

    if report.successes() == 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn probe_all(
    client: &Client,
    targets: &[Target],
    cancel: &CancellationToken,
    args: &Args,
) -> Result<ExitCode> {
    info!(
        targets = targets.len(),
        delay_ms = args.delay_ms,
        "checking targets"
    );
    let mut probes = Map::new();
    let mut reachable = 0;
    for (target, result) in client.probe_all(targets, cancel).await {
        let value = match result {
            Ok(probe) => {
                reachable += 1;
                info!(
                    "{}: status {}, {} bytes, title {:?}",
                    target.label, probe.status, probe.content_length, probe.title
                );
                serde_json::to_value(&probe)?
            }
            Err(err) => {
                warn!("{}: unreachable: {}", target.label, err);
                json!({ "url": target.url, "error": err.to_string() })
            }
        };
        probes.insert(target.label, value);
    }

    println!("{}", to_json(&Value::Object(probes), args.compact)?);
    if reachable == 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn to_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(json)
}

fn write_output(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!("results saved to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
