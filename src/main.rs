//! MindEase terminal driver.
//!
//! `mindease chat` runs the intake as a line-oriented REPL against the
//! configured analysis service. `health` and `conditions` query the service
//! directly.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::providers::{Format, Serialized, Toml};

use mindease_lib::backend::{AnalysisBackend, HttpAnalysisClient};
use mindease_lib::config::{self, IntakeConfig};
use mindease_lib::intake::{AssessmentOutcome, IntakeError, IntakeService, TurnOutcome};
use mindease_lib::models::Message;
use mindease_lib::report::{export_to_dir, ReportFormat};

#[derive(Parser)]
#[command(name = "mindease")]
#[command(version, about = "Conversational mental-health intake")]
struct Args {
    /// Extra TOML config file, layered over the default sources
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Analysis service base URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Level at which the assessment becomes available (4 or 5)
    #[arg(long)]
    threshold: Option<u8>,

    /// Keep the transcript across runs
    #[arg(long)]
    persist: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive intake conversation (default)
    Chat,
    /// Check whether the analysis service is up
    Health,
    /// List the conditions the service can assess
    Conditions,
}

fn load_config(args: &Args) -> Result<IntakeConfig> {
    let mut figment = IntakeConfig::figment();
    if let Some(path) = &args.config {
        figment = figment.merge(Toml::file(path));
    }
    if let Some(url) = &args.backend_url {
        figment = figment.merge(Serialized::default("backend.base_url", url));
    }
    if let Some(threshold) = args.threshold {
        figment = figment.merge(Serialized::default("intake.progression_threshold", threshold));
    }
    if args.persist {
        figment = figment.merge(Serialized::default("intake.persist_transcript", true));
    }
    IntakeConfig::from_figment(figment).context("invalid configuration")
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    mindease_lib::init_tracing(&config.log_filter);
    tracing::info!("MindEase starting v{}", config::APP_VERSION);

    let backend: Arc<dyn AnalysisBackend> = Arc::new(
        HttpAnalysisClient::from_config(&config.backend).context("cannot build HTTP client")?,
    );

    match args.command.unwrap_or(Command::Chat) {
        Command::Health => {
            if backend.health() {
                println!("Analysis service at {} is up", backend.base_url());
            } else {
                println!("Analysis service at {} is not reachable", backend.base_url());
            }
        }
        Command::Conditions => {
            let conditions = backend.conditions().context("cannot fetch conditions")?;
            for condition in conditions {
                println!("{}: {}", condition.name, condition.description);
            }
        }
        Command::Chat => {
            let service = IntakeService::open(&config, backend)
                .context("cannot open transcript storage")?;
            run_chat(&service, &config)?;
        }
    }
    Ok(())
}

const HELP: &str = "Commands: /results  /report  /export [pdf|html]  /new  /help  /quit";

fn run_chat(service: &IntakeService, config: &IntakeConfig) -> Result<()> {
    for message in service.view()?.messages {
        print_message(&message);
    }
    println!("({HELP})");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();

        match input.split_once(' ').map_or((input, ""), |(c, rest)| (c, rest.trim())) {
            ("/quit", _) | ("/exit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/new", _) => {
                for message in service.reset()?.messages {
                    print_message(&message);
                }
            }
            ("/results", _) => {
                println!("  ...{}", mindease_lib::intake::prompts::ANALYZING_PLACEHOLDER);
                match service.request_assessment() {
                    Ok(outcome) => print_assessment_outcome(&outcome),
                    Err(e) => println!("  {e}"),
                }
            }
            ("/report", _) => match service.report()? {
                Some(report) => println!("{}", report.to_plain_text()),
                None => println!("  No assessment yet."),
            },
            ("/export", format) => {
                let format: ReportFormat = if format.is_empty() {
                    ReportFormat::Pdf
                } else {
                    match format.parse() {
                        Ok(f) => f,
                        Err(e) => {
                            println!("  {e}");
                            continue;
                        }
                    }
                };
                match service.download(format) {
                    Ok(download) => {
                        let path = export_to_dir(&download, &config.storage.exports_dir())?;
                        println!("  Saved {}", path.display());
                    }
                    Err(e) => println!("  {e}"),
                }
            }
            _ => match service.submit_turn(input) {
                Ok(outcome) => print_turn_outcome(&outcome),
                Err(IntakeError::InvalidInput) => {}
                Err(e) => println!("  {e}"),
            },
        }
    }
    Ok(())
}

fn print_message(message: &Message) {
    let who = if message.is_user() { "you" } else { "mindease" };
    for (i, line) in message.text().lines().enumerate() {
        if i == 0 {
            println!("{who:>9}: {line}");
        } else {
            println!("{:>9}  {line}", "");
        }
    }
}

fn print_turn_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Replied { message, .. }
        | TurnOutcome::Crisis { message }
        | TurnOutcome::Failed { message, .. } => print_message(message),
        TurnOutcome::AssessmentRequested(outcome) => print_assessment_outcome(outcome),
        TurnOutcome::Discarded => {}
    }
}

fn print_assessment_outcome(outcome: &AssessmentOutcome) {
    match outcome {
        AssessmentOutcome::Rendered { assessment, message } => {
            print_message(message);
            println!("{}", mindease_lib::report::render(assessment).to_plain_text());
        }
        AssessmentOutcome::Failed { message, .. } => print_message(message),
        AssessmentOutcome::Discarded => {}
    }
}
