//! gitscribe - CLI entry point.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gitscribe::auth::CredentialCache;
use gitscribe::config::{Config, CostDisplay, PartialConfig, SpinnerSetting};
use gitscribe::git::{GitDiff, check_git_installed};
use gitscribe::http::{CurlTransport, check_curl_installed};
use gitscribe::llm::{Provider, ProviderAdapter};
use gitscribe::progress::TerminalNotifier;
use gitscribe::{FinishKind, Generator};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GITSCRIBE_LOG";

/// Generate a commit message for the staged changes using an LLM.
#[derive(Parser, Debug)]
#[command(name = "gitscribe")]
#[command(about = "Generate a commit message for the staged changes using an LLM")]
#[command(version)]
struct Cli {
    /// LLM provider (copilot or openai)
    #[arg(long)]
    provider: Option<Provider>,

    /// Model id (e.g. gpt-4o, gpt-5-mini)
    #[arg(long)]
    model: Option<String>,

    /// Lines of context around each change in the diff
    #[arg(long)]
    context_lines: Option<u32>,

    /// Cost summary on success (off, compact or verbose)
    #[arg(long)]
    cost_display: Option<CostDisplay>,

    /// Show a static progress line instead of a spinner
    #[arg(long)]
    no_spinner: bool,

    /// Suppress all progress output on stderr
    #[arg(short, long)]
    quiet: bool,

    /// Path to config file (defaults to <config dir>/gitscribe/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> PartialConfig {
        PartialConfig {
            provider: self.provider,
            model: self.model.clone(),
            context_lines: self.context_lines,
            cost_display: self.cost_display,
            spinner_frames: self.no_spinner.then_some(SpinnerSetting::Toggle(false)),
            notifications: self.quiet.then_some(false),
            ..PartialConfig::default()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let file = match &cli.config {
        Some(path) => PartialConfig::load(path)?,
        None => PartialConfig::load_default()?,
    };
    Ok(Config::setup(file.merge(cli.overrides())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Step 1: Load configuration
    let config = load_config(&cli).context("Failed to load configuration")?;

    // Step 2: Check prerequisites
    check_git_installed().context("git is required")?;
    check_curl_installed().context("curl is required")?;

    // Step 3: Wire collaborators
    let transport = Arc::new(CurlTransport::new(config.http_timeout_secs));
    let provider = ProviderAdapter::new(transport, Arc::new(CredentialCache::new()));
    let generator = Generator::new(
        Arc::new(GitDiff::new()),
        Arc::new(provider),
        Arc::new(TerminalNotifier::new()),
    );

    // Step 4: Generate
    let result = generator.generate(&config).await;

    match result.kind {
        FinishKind::Success => {
            println!("{}", result.text());
            Ok(())
        }
        FinishKind::Warning => {
            if !config.notifications {
                eprintln!("Warning: {}", result.text());
            }
            Ok(())
        }
        FinishKind::Error => bail!(result.into_text()),
    }
}
