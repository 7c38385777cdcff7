//! adosim demo driver
//!
//! Loads the scenario, plays a sequence of defensive actions against the
//! inference service and prints the exported report.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;
use tracing_subscriber::EnvFilter;

use adosim::config::DEFAULT_OPTIMIZATION_BUDGET;
use adosim::{
    BundledScenarioSource, ClientConfig, ExportReport, FileScenarioSource, HttpInferenceClient,
    HttpScenarioSource, JsonReportAssembler, MarkdownReportAssembler, ReportAssembler,
    ScenarioCatalogLoader, ScenarioSource, SessionConfig, SimulationSession,
};

const DEMO_ACTIONS: [&str; 3] = ["patch_db", "auth_logs", "web_honeypot"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Format {
    Markdown,
    Json,
}

/// CLI configuration
struct Config {
    client: ClientConfig,
    fallback_file: Option<PathBuf>,
    optimize_budget: Option<f64>,
    format: Format,
    actions: Vec<String>,
}

fn usage() {
    println!("adosim - turn-limited adversary simulation driver");
    println!();
    println!("USAGE:");
    println!("    adosim [OPTIONS] [ACTION_ID]...");
    println!();
    println!("Plays the given actions in order (default: {}).", DEMO_ACTIONS.join(" "));
    println!();
    println!("OPTIONS:");
    println!("    -u, --api-url <URL>         Inference service URL [env: ADOSIM_API_URL]");
    println!("    -k, --api-key <KEY>         Demo API key [env: ADOSIM_API_KEY]");
    println!("    -t, --timeout <SECS>        HTTP timeout in seconds [default: 30]");
    println!("    -s, --scenario-file <PATH>  Fallback scenario file [default: bundled]");
    println!("    -o, --optimize [BUDGET]     Ask the optimizer first [default budget: 100]");
    println!("    -f, --format <FMT>          Report format: markdown | json [default: markdown]");
    println!("    -h, --help                  Print help information");
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_args(args: &[String]) -> Result<Option<Config>, String> {
    let mut config = Config {
        client: ClientConfig::from_env(),
        fallback_file: None,
        optimize_budget: None,
        format: Format::Markdown,
        actions: Vec::new(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--api-url" | "-u" => {
                let key = config.client.api_key.take();
                let timeout = config.client.timeout;
                config.client = ClientConfig::new(value(args, i, "--api-url")?).with_timeout(timeout);
                config.client.api_key = key;
                i += 2;
            }
            "--api-key" | "-k" => {
                config.client.api_key = Some(value(args, i, "--api-key")?.to_string());
                i += 2;
            }
            "--timeout" | "-t" => {
                let raw = value(args, i, "--timeout")?;
                let secs: u64 = raw
                    .parse()
                    .map_err(|_| format!("invalid timeout: {raw}"))?;
                config.client.timeout = Duration::from_secs(secs);
                i += 2;
            }
            "--scenario-file" | "-s" => {
                config.fallback_file = Some(PathBuf::from(value(args, i, "--scenario-file")?));
                i += 2;
            }
            "--optimize" | "-o" => {
                match args.get(i + 1).and_then(|s| s.parse::<f64>().ok()) {
                    Some(budget) => {
                        config.optimize_budget = Some(budget);
                        i += 2;
                    }
                    None => {
                        config.optimize_budget = Some(DEFAULT_OPTIMIZATION_BUDGET);
                        i += 1;
                    }
                }
            }
            "--format" | "-f" => {
                config.format = match value(args, i, "--format")? {
                    "markdown" | "md" => Format::Markdown,
                    "json" => Format::Json,
                    other => return Err(format!("unknown format: {other}")),
                };
                i += 2;
            }
            "--help" | "-h" => {
                usage();
                return Ok(None);
            }
            arg if arg.starts_with('-') => return Err(format!("unknown argument: {arg}")),
            action => {
                config.actions.push(action.to_string());
                i += 1;
            }
        }
    }

    if config.actions.is_empty() {
        config.actions = DEMO_ACTIONS.iter().map(|s| (*s).to_string()).collect();
    }
    Ok(Some(config))
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let primary: Arc<dyn ScenarioSource> = Arc::new(HttpScenarioSource::new(config.client.clone())?);
    let fallback: Arc<dyn ScenarioSource> = match &config.fallback_file {
        Some(path) => Arc::new(FileScenarioSource::new(path)),
        None => Arc::new(BundledScenarioSource::default()),
    };
    let loader = ScenarioCatalogLoader::new(primary, fallback);
    let client = Arc::new(HttpInferenceClient::new(config.client.clone())?);

    let session = SimulationSession::from_catalog(&loader, client, SessionConfig::default()).await?;
    if session.is_degraded() {
        eprintln!("Offline Mode: using local scenario");
    }

    if let Some(budget) = config.optimize_budget {
        if session.can_optimize() {
            // Failure is already logged on the session; keep playing.
            let _ = session.request_optimization(budget).await;
        }
    }

    for action in &config.actions {
        if session.is_complete() {
            eprintln!("Simulation complete; ignoring '{action}'");
            continue;
        }
        if let Err(e) = session.apply_action(action).await {
            eprintln!("{e}");
        }
    }

    for line in session.log().iter().rev() {
        eprintln!("{line}");
    }

    let report = ExportReport::from_snapshot(&session.snapshot());
    let document = match config.format {
        Format::Markdown => MarkdownReportAssembler.assemble(&report)?,
        Format::Json => JsonReportAssembler { pretty: true }.assemble(&report)?,
    };
    println!("{document}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("adosim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match parse_args(&args) {
        Ok(Some(config)) => config,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "simulation aborted");
            ExitCode::FAILURE
        }
    }
}
