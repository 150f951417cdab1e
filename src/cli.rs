//! Command-line entry points.

use crate::compression::RemoteCompressionStrategy;
use crate::config::Config;
use crate::document::{DocumentSource, FileSource, FixtureSource, HttpSource};
use crate::eval::{EvaluationHarness, EvaluationReport, HarnessSettings, SavingsMetric, render_text};
use crate::provider::OpenAiCompatClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use std::sync::Arc;

/// Measure what context compression saves on LLM calls
#[derive(Parser, Debug)]
#[command(name = "squeeze", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question with and without compression and compare
    Eval(EvalArgs),
    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show config file path
    Path,
    /// Show the effective configuration
    Show,
}

#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct EvalArgs {
    /// Question to ask
    #[arg(short, long)]
    pub question: String,

    /// File path or http(s) URL to read context from (built-in sample if omitted)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Keep only the first N documents
    #[arg(long)]
    pub max_documents: Option<usize>,

    /// Target compression ratio in (0, 1]
    #[arg(short, long)]
    pub ratio: Option<f64>,

    /// Model id sent to the inference endpoint
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f32>,

    /// Force temperature 0 on both runs
    #[arg(long)]
    pub deterministic: bool,

    /// Quantity compared for savings
    #[arg(long, value_enum)]
    pub metric: Option<SavingsMetric>,

    /// Run baseline and compressed calls concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Retries for rate limits and transient inference failures
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Output format
    #[arg(short = 'o', long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl EvalArgs {
    /// Apply flags on top of the configured harness settings.
    fn apply(&self, config: &mut Config) {
        let settings = &mut config.eval;
        if let Some(ratio) = self.ratio {
            settings.ratio = ratio;
        }
        if let Some(max_tokens) = self.max_tokens {
            settings.max_tokens = max_tokens;
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
        if let Some(metric) = self.metric {
            settings.metric = metric;
        }
        if let Some(max_retries) = self.max_retries {
            settings.max_retries = max_retries;
        }
        settings.deterministic |= self.deterministic;
        settings.parallel |= self.parallel;
        if let Some(ref model) = self.model {
            config.inference.model.clone_from(model);
        }
    }

    fn source(&self, config: &Config) -> Arc<dyn DocumentSource> {
        match self.source.as_deref() {
            None => Arc::new(FixtureSource::sample()),
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => Arc::new(
                HttpSource::new(url, config.inference.timeout())
                    .with_max_documents(self.max_documents),
            ),
            Some(path) => Arc::new(FileSource::new(path).with_max_documents(self.max_documents)),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = match std::env::var("SQUEEZE_LOG") {
        Ok(directive) => tracing_subscriber::EnvFilter::new(directive),
        Err(_) if verbose => tracing_subscriber::EnvFilter::new("squeeze=debug"),
        Err(_) => return,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Build the harness from config and flags.
fn setup_harness(args: &EvalArgs, config: &Config) -> Result<EvaluationHarness> {
    let settings: HarnessSettings = config.eval.clone();
    settings.validate()?;

    let inference = OpenAiCompatClient::from_config(&config.inference)
        .context("Failed to set up inference client")?;
    let compressor = RemoteCompressionStrategy::from_config(&config.compression);

    Ok(EvaluationHarness::new(
        args.source(config),
        Arc::new(compressor),
        Arc::new(inference),
        settings,
    ))
}

fn output_report(report: &EvaluationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_text(report)?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

/// Run a baseline vs compressed evaluation.
pub async fn eval(args: EvalArgs) -> ExitCode {
    match eval_inner(args).await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn eval_inner(args: EvalArgs) -> Result<()> {
    init_tracing(args.verbose);

    let mut config = Config::load()?;
    args.apply(&mut config);

    let harness = setup_harness(&args, &config)?;
    let report = harness.run(&args.question).await?;
    output_report(&report, args.format)
}

#[must_use]
pub fn config(args: ConfigArgs) -> ExitCode {
    match args.action {
        Some(ConfigAction::Path) => {
            println!("{}", Config::path().display());
            ExitCode::from(0)
        }
        None | Some(ConfigAction::Show) => match Config::load() {
            Ok(config) => {
                println!("{config:#?}");
                ExitCode::from(0)
            }
            Err(e) => {
                eprintln!("Error loading config: {e:#}");
                ExitCode::from(1)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_eval(args: &[&str]) -> EvalArgs {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        match cli.command {
            Commands::Eval(args) => args,
            Commands::Config(_) => panic!("expected eval"),
        }
    }

    #[test]
    fn test_parse_eval_minimal() {
        let args = parse_eval(&["squeeze", "eval", "-q", "Who?"]);
        assert_eq!(args.question, "Who?");
        assert!(args.source.is_none());
        assert!(args.ratio.is_none());
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.parallel);
    }

    #[test]
    fn test_parse_eval_requires_question() {
        assert!(Cli::try_parse_from(["squeeze", "eval"]).is_err());
    }

    #[test]
    fn test_parse_eval_all_flags() {
        let args = parse_eval(&[
            "squeeze",
            "eval",
            "--question",
            "Q",
            "--source",
            "docs.txt",
            "--max-documents",
            "3",
            "--ratio",
            "0.25",
            "--model",
            "gpt-4o",
            "--max-tokens",
            "64",
            "--temperature",
            "0.2",
            "--deterministic",
            "--metric",
            "prompt-tokens",
            "--parallel",
            "--max-retries",
            "2",
            "--format",
            "json",
            "-v",
        ]);
        assert_eq!(args.source.as_deref(), Some("docs.txt"));
        assert_eq!(args.max_documents, Some(3));
        assert_eq!(args.ratio, Some(0.25));
        assert_eq!(args.metric, Some(SavingsMetric::PromptTokens));
        assert_eq!(args.max_retries, Some(2));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.deterministic && args.parallel && args.verbose);
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["squeeze", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Path)
            })
        ));
    }

    #[test]
    fn test_apply_overrides_config() {
        let args = parse_eval(&[
            "squeeze", "eval", "-q", "Q", "-r", "0.3", "-m", "local-model", "--deterministic",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.eval.ratio, 0.3);
        assert!(config.eval.deterministic);
        assert_eq!(config.inference.model, "local-model");
        // Unset flags keep configured values.
        assert_eq!(config.eval.max_tokens, HarnessSettings::default().max_tokens);
        assert!(!config.eval.parallel);
    }

    #[test]
    fn test_apply_keeps_config_flags() {
        let args = parse_eval(&["squeeze", "eval", "-q", "Q"]);
        let mut config = Config::default();
        config.eval.parallel = true;
        args.apply(&mut config);
        assert!(config.eval.parallel);
    }

    #[test]
    fn test_setup_rejects_bad_settings() {
        let args = parse_eval(&["squeeze", "eval", "-q", "Q", "--max-tokens", "0"]);
        let mut config = Config::default();
        config.inference.base_url = "http://localhost:11434/v1".to_string();
        args.apply(&mut config);
        assert!(setup_harness(&args, &config).is_err());
    }

    #[test]
    fn test_setup_local_endpoint_without_key() {
        let args = parse_eval(&["squeeze", "eval", "-q", "Q"]);
        let mut config = Config::default();
        config.inference.base_url = "http://127.0.0.1:8080/v1".to_string();
        let harness = setup_harness(&args, &config).unwrap();
        assert_eq!(harness.settings().ratio, HarnessSettings::default().ratio);
    }
}
