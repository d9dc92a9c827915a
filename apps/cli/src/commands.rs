//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use refwriter_core::{
    ArticleOutcome, BatchReport, Pipeline, ProgressReporter, REFERENCES_PER_ARTICLE,
};
use refwriter_crawler::Extractor;
use refwriter_discovery::{Discoverer, DiscoveryPolicy, SerpApiProvider};
use refwriter_shared::{
    AppConfig, init_config, load_config, load_config_from, resolve_api_keys, resolve_search_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// refwriter: rewrite stored articles in the style of top-ranked references.
#[derive(Parser)]
#[command(
    name = "refwriter",
    version,
    about = "Rewrite stored articles in the style of two reference articles found on the web.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.refwriter/refwriter.toml.
    #[arg(long, global = true, env = "REFWRITER_CONFIG")]
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
    /// Rewrite every article that has not been updated yet (one batch).
    Run,

    /// Show the admissible references the search provider yields for a title.
    Discover {
        /// Article title to search for.
        title: String,

        /// Maximum number of references to return.
        #[arg(short = 'n', long, default_value_t = REFERENCES_PER_ARTICLE)]
        count: usize,
    },

    /// Print the text extracted from one reference page.
    Extract {
        /// Page URL.
        url: String,
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

const LOG_TARGETS: &[&str] = &[
    "refwriter_cli",
    "refwriter_core",
    "refwriter_discovery",
    "refwriter_crawler",
    "refwriter_storage",
    "refwriter_shared",
];

/// Initialize tracing based on CLI flags. `RUST_LOG` takes precedence.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

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
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run => cmd_run(config_path).await,
        Command::Discover { title, count } => cmd_discover(config_path, &title, count).await,
        Command::Extract { url } => cmd_extract(config_path, &url).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn load(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    // Both keys must be present before any article is touched.
    let keys = resolve_api_keys(&config)?;

    let pipeline = Pipeline::from_config(&config, &keys)?;
    info!(
        storage = %config.storage.base_url,
        model = %config.model.model,
        write_policy = ?config.storage.write_policy,
        "starting refwriter batch"
    );

    let reporter = CliProgress::new();
    let report = pipeline.run_batch(&reporter).await?;

    print_report(&report);
    Ok(())
}

async fn cmd_discover(config_path: Option<&Path>, title: &str, count: usize) -> Result<()> {
    let config = load(config_path)?;
    let key = resolve_search_key(&config)?;

    let provider = SerpApiProvider::new(&config.search, key)?;
    let discoverer = Discoverer::new(Arc::new(provider), DiscoveryPolicy::from(&config.search));

    let references = discoverer.discover(title, count).await?;
    if references.is_empty() {
        println!("No admissible references found.");
        return Ok(());
    }
    for (i, reference) in references.iter().enumerate() {
        println!("{}. {}  (search rank {})", i + 1, reference.url, reference.rank + 1);
    }
    Ok(())
}

async fn cmd_extract(config_path: Option<&Path>, url: &str) -> Result<()> {
    let config = load(config_path)?;
    let extractor = Extractor::new(&config.extractor)?;

    let text = extractor.extract(url).await?;
    if text.is_empty() {
        return Err(eyre!("no paragraph text found at {url}"));
    }
    println!("{text}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!();
    println!("  Batch {} finished", report.batch_id);
    println!("  Articles:        {}", report.total);
    println!("  Updated:         {}", report.updated.len());
    println!("  Already updated: {}", report.already_updated);
    println!("  Skipped:         {}", report.skipped.len());
    println!("  Failed:          {}", report.failed.len());
    println!("  Time:            {:.1}s", report.elapsed.as_secs_f64());

    if !report.skipped.is_empty() {
        println!();
        println!("  Skipped:");
        for (id, reason) in &report.skipped {
            println!("    {id}: {reason}");
        }
    }
    if !report.failed.is_empty() {
        println!();
        println!("  Failed:");
        for (id, reason) in &report.failed {
            println!("    {id}: {reason}");
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn article_started(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Article [{current}/{total}] {title}"));
    }

    fn article_finished(&self, title: &str, outcome: &ArticleOutcome) {
        match outcome {
            ArticleOutcome::Updated => self.spinner.println(format!("  updated  {title}")),
            ArticleOutcome::Skipped(reason) => {
                self.spinner.println(format!("  skipped  {title} ({reason})"))
            }
            ArticleOutcome::Failed(reason) => {
                self.spinner.println(format!("  FAILED   {title} ({reason})"))
            }
        }
    }

    fn done(&self, _report: &BatchReport) {
        self.spinner.finish_and_clear();
    }
}
