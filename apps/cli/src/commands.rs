//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracktect_core::{Collaborators, Pipeline, PipelineInput, PipelineOptions, ProgressReporter};
use tracktect_shared::{
    AppConfig, HandleOverrides, PipelineResult, PublishStatus, init_config, init_config_at,
    load_config, load_config_from,
};
use tracktect_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TrackTect: track what companies say on their sites and socials.
#[derive(Parser)]
#[command(
    name = "tracktect",
    version,
    about = "Scrape, classify, and track company web properties and social channels.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.tracktect/tracktect.toml.
    #[arg(long, global = true, env = "TRACKTECT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full tracking pipeline over one or more URLs.
    Run {
        /// Company URLs to track, processed in the given order.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Pin a Twitter/X handle for a URL (URL=HANDLE, repeatable).
        #[arg(long = "twitter", value_name = "URL=HANDLE")]
        twitter: Vec<String>,

        /// Pin a YouTube channel for a URL (URL=CHANNEL_URL, repeatable).
        #[arg(long = "youtube", value_name = "URL=CHANNEL")]
        youtube: Vec<String>,

        /// Write the full run result as JSON to this path.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip pushing updates to the knowledge store.
        #[arg(long)]
        no_publish: bool,
    },

    /// List recent tracking runs.
    History {
        /// Number of runs to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tracktect=info",
        1 => "tracktect=debug",
        _ => "tracktect=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Run {
            urls,
            twitter,
            youtube,
            out,
            no_publish,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_run(config, urls, &twitter, &youtube, out.as_deref(), !no_publish).await
        }
        Command::History { limit } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_history(&config, limit).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path.as_deref()),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config: AppConfig,
    urls: Vec<String>,
    twitter: &[String],
    youtube: &[String],
    out: Option<&Path>,
    publish: bool,
) -> Result<()> {
    // Flags extend the config-file overrides; a flag for the same URL wins.
    let mut twitter_overrides = config.overrides.twitter.clone();
    twitter_overrides.extend(parse_overrides(twitter)?);
    let mut youtube_overrides = config.overrides.youtube.clone();
    youtube_overrides.extend(parse_overrides(youtube)?);

    let storage = Arc::new(Storage::open(Path::new(&config.defaults.database_path)).await?);
    let deps = Collaborators::live(&config, storage, publish)?;
    let pipeline = Pipeline::new(deps, PipelineOptions::from(&config));

    let input = PipelineInput {
        urls,
        twitter_overrides,
        youtube_overrides,
    };

    info!(urls = input.urls.len(), publish, "starting tracking run");

    let reporter = CliProgress::new();
    let result = pipeline.run(&input, &reporter).await;
    reporter.spinner.finish_and_clear();
    let result = result?;

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).map_err(|e| eyre!("cannot write {}: {e}", path.display()))?;
    }

    print_summary(&result, out);
    Ok(())
}

fn print_summary(result: &PipelineResult, out: Option<&Path>) {
    let tweets: usize = result.tweets.values().map(Vec::len).sum();
    let videos: usize = result.youtube.values().map(Vec::len).sum();
    let notion = match &result.notion_status {
        PublishStatus::Success => "success".to_string(),
        PublishStatus::Skipped => "skipped".to_string(),
        PublishStatus::Partial { failed } => format!("partial (failed: {})", failed.join(", ")),
    };

    println!();
    println!("  Run complete!");
    println!("  ID:       {}", result.run_id);
    println!("  Domains:  {}", result.classified.len());
    println!("  Tweets:   {tweets}");
    println!("  Videos:   {videos}");
    println!("  Notion:   {notion}");
    if let Some(path) = out {
        println!("  Result:   {}", path.display());
    }
    println!();
}

async fn cmd_history(config: &AppConfig, limit: usize) -> Result<()> {
    let path = PathBuf::from(&config.defaults.database_path);
    if !path.exists() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    let storage = Storage::open_readonly(&path).await?;
    let runs = storage.list_runs(limit).await?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    println!("{:<38} {:<27} {:>4}  STATUS", "RUN", "STARTED", "URLS");
    for run in runs {
        println!(
            "{:<38} {:<27} {:>4}  {}",
            run.id, run.started_at, run.url_count, run.status
        );
    }
    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(p) => init_config_at(p)?,
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Parse repeated `URL=VALUE` flags into an ordered override map.
///
/// Splits on the last `=` so query strings in the URL survive.
fn parse_overrides(pairs: &[String]) -> Result<HandleOverrides> {
    let mut map = HandleOverrides::new();
    for pair in pairs {
        let (url, value) = pair
            .rsplit_once('=')
            .map(|(u, v)| (u.trim(), v.trim()))
            .filter(|(u, v)| !u.is_empty() && !v.is_empty())
            .ok_or_else(|| eyre!("invalid override '{pair}': expected URL=VALUE"))?;
        map.insert(url.to_string(), value.to_string());
    }
    Ok(map)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Prints run log lines above an indicatif spinner showing the current stage.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn log_line(&self, line: &str) {
        self.spinner.println(line);
    }

    fn done(&self, _result: &PipelineResult) {
        self.spinner.finish_and_clear();
    }
}
