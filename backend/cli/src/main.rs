mod replay;
mod terminal_output;
mod wiring;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use redial_classifier::{MatchMode, OutcomeClassifier};
use redial_config::{
    apply_all_defaults, config_dir, config_file_path, load_config, prepare, resolve_env_vars,
    validate, write_config, RedialConfig,
};
use redial_core::{tel_uri_address, DialedNumber};
use redial_logging::init_logger;

use terminal_output::{
    format_event, note_error, note_info, note_success, note_warn, render_table, summarize, Column,
};

#[derive(Parser)]
#[command(name = "redial")]
#[command(about = "Redial: hands failed GSM calls over to a messaging app")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.redial/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the engine from an NDJSON signal script
    Replay {
        script: PathBuf,
    },
    /// Print the canonical form of a number or tel: URI
    Normalize {
        raw: String,
    },
    /// Classify a call UI notification text
    Classify {
        text: String,
        /// Also try keyword matching
        #[arg(long)]
        fuzzy: bool,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with defaults applied
    Show,
    /// Validate the config and list every problem
    Check,
    /// Write a config file with every default filled in
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    let raw = load_config(&path).await?;
    init_logger(&wiring::log_options(&raw, cli.log_level.clone()));

    match cli.command {
        Commands::Replay { script } => run_replay(prepare(raw)?, &script).await,
        Commands::Normalize { raw: number } => normalize(&prepare(raw)?, &number),
        Commands::Classify { text, fuzzy } => classify(&prepare(raw)?, &text, fuzzy),
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                print!("{}", serde_yaml::to_string(&prepare(raw)?)?);
                Ok(())
            }
            ConfigAction::Check => check_config(raw, &path),
            ConfigAction::Init { force } => init_config(&path, force).await,
        },
    }
}

async fn run_replay(config: RedialConfig, script: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("Failed to read script: {}", script.display()))?;
    let steps = replay::parse_script(&text)
        .with_context(|| format!("Invalid script: {}", script.display()))?;
    info!(script = %script.display(), "Replaying signal script");

    let events = replay::run_replay(&config, steps).await?;
    let redact = wiring::redact_numbers(&config);
    for event in &events {
        println!("{}", format_event(event, redact));
    }
    println!();
    print!("{}", summarize(&events));
    Ok(())
}

fn normalize(config: &RedialConfig, raw: &str) -> Result<()> {
    let address = tel_uri_address(raw).unwrap_or_else(|| raw.to_string());
    match DialedNumber::parse(&address, &wiring::number_plan(config)) {
        Some(number) => {
            println!("{number}");
            Ok(())
        }
        None => bail!("'{raw}' contains no digits"),
    }
}

fn classify(config: &RedialConfig, text: &str, fuzzy: bool) -> Result<()> {
    let mut settings = wiring::classifier_settings(config)?;
    if fuzzy {
        settings.mode = MatchMode::Fuzzy;
    }
    let classifier = OutcomeClassifier::new(settings);

    match classifier.classify_text(text) {
        Some(verdict) => {
            let rows = vec![
                vec!["outcome".to_string(), verdict.outcome.to_string()],
                vec!["matched by".to_string(), format!("{:?}", verdict.matched_by)],
                vec!["redirects".to_string(), verdict.qualifies().to_string()],
                vec![
                    "terminates call".to_string(),
                    verdict.policy.requires_termination.to_string(),
                ],
            ];
            print!("{}", render_table(&[Column::left("Field"), Column::left("Value")], &rows));
        }
        None => note_info("Not a call outcome"),
    }
    Ok(())
}

fn check_config(raw: RedialConfig, path: &Path) -> Result<()> {
    let value = serde_json::to_value(&raw)?;
    let value = match resolve_env_vars(&value) {
        Ok(v) => v,
        Err(e) => {
            note_error(&e.to_string());
            std::process::exit(1);
        }
    };
    let config = apply_all_defaults(serde_json::from_value(value)?);
    let report = validate(&config);

    let rows: Vec<Vec<String>> = report
        .errors
        .iter()
        .map(|e| vec!["error".to_string(), e.path.clone(), e.message.clone()])
        .chain(
            report
                .warnings
                .iter()
                .map(|w| vec!["warning".to_string(), w.path.clone(), w.message.clone()]),
        )
        .collect();
    if !rows.is_empty() {
        let columns = [Column::left("Level"), Column::left("Path"), Column::left("Message")];
        print!("{}", render_table(&columns, &rows));
    }

    if report.is_valid() {
        if report.warnings.is_empty() {
            note_success(&format!("{} is valid", path.display()));
        } else {
            note_warn(&format!(
                "{} is valid with {} warning(s)",
                path.display(),
                report.warnings.len()
            ));
        }
        Ok(())
    } else {
        note_error(&format!("{} has {} error(s)", path.display(), report.errors.len()));
        std::process::exit(1);
    }
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    write_config(&apply_all_defaults(RedialConfig::default()), path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
