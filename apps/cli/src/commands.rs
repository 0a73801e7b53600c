//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use cardfeed_ankiconnect::{AnkiConnectClient, ClientOptions};
use cardfeed_core::{
    ExportConfig, ExtractConfig, ProgressReporter, UpdateConfig, export_notes, extract_notes,
    run_update,
};
use cardfeed_shared::{
    AppConfig, CardfeedError, SyncConfig, init_config, load_config, load_config_from,
};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Report, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// cardfeed: canonical notes in, flashcard updates out.
#[derive(Parser)]
#[command(
    name = "cardfeed",
    version,
    about = "Export canonical notes, extract rendered fragments, and update flashcards via AnkiConnect.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.cardfeed/cardfeed.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Flags that override config file values.
#[derive(Args, Debug, Default)]
pub(crate) struct Overrides {
    /// AnkiConnect URL.
    #[arg(long, global = true, env = "CARDFEED_ANKI_URL")]
    pub anki_url: Option<String>,

    /// Field receiving front_html.
    #[arg(long, global = true)]
    pub front_field: Option<String>,

    /// Field receiving back_html (auto-detected when unset).
    #[arg(long, global = true)]
    pub back_field: Option<String>,

    /// Field receiving legacy answer_html (auto-detected when unset).
    #[arg(long, global = true)]
    pub field: Option<String>,

    /// Field holding the canonical note id on the flashcard side.
    #[arg(long, global = true)]
    pub identity_field: Option<String>,

    /// H3 label opening the front content.
    #[arg(long, global = true)]
    pub front_label: Option<String>,

    /// H3 label opening the back content.
    #[arg(long, global = true)]
    pub back_label: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.anki_url {
            config.anki.url = url.clone();
        }
        if let Some(field) = &self.front_field {
            config.fields.front_field = field.clone();
        }
        if self.back_field.is_some() {
            config.fields.back_field = self.back_field.clone();
        }
        if self.field.is_some() {
            config.fields.answer_field = self.field.clone();
        }
        if let Some(field) = &self.identity_field {
            config.fields.identity_field = field.clone();
        }
        if let Some(label) = &self.front_label {
            config.labels.front = label.clone();
        }
        if let Some(label) = &self.back_label {
            config.labels.back = label.clone();
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render canonical markdown notes into an import TSV.
    Export {
        /// Note files, directories, or glob patterns.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output TSV path.
        #[arg(short, long)]
        out: PathBuf,

        /// TSV mapping note_id to noteId.
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Export only the first N notes.
        #[arg(long)]
        limit: Option<usize>,

        /// Replace the output file if it exists.
        #[arg(long)]
        overwrite: bool,
    },

    /// Split a rendered HTML document into per-note front/back rows.
    Extract {
        /// Rendered HTML document.
        input: PathBuf,

        /// Output TSV path.
        #[arg(short, long)]
        out: PathBuf,

        /// TSV mapping note_id to noteId.
        #[arg(long)]
        mapping: Option<PathBuf>,
    },

    /// Push TSV rows into existing notes through AnkiConnect.
    Update {
        /// Update TSV (note_id, noteId, and front_html/back_html/answer_html).
        input: PathBuf,

        /// TSV mapping note_id to noteId, consulted before lookups.
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Process only the first N rows.
        #[arg(long)]
        limit: Option<usize>,

        /// Show what would be written without sending anything.
        #[arg(long)]
        dry_run: bool,
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
        0 => "cardfeed=info",
        1 => "cardfeed=debug",
        _ => "cardfeed=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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

/// Bad input or an unreachable endpoint; the binary exits with status 2.
pub(crate) fn is_usage_failure(report: &Report) -> bool {
    report
        .downcast_ref::<CardfeedError>()
        .is_some_and(|e| {
            e.is_input_error()
                || matches!(e, CardfeedError::Network(_) | CardfeedError::Protocol { .. })
        })
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    cli.overrides.apply(&mut config);

    match cli.command {
        Command::Export {
            inputs,
            out,
            mapping,
            limit,
            overwrite,
        } => cmd_export(&config, inputs, out, mapping, limit, overwrite),
        Command::Extract {
            input,
            out,
            mapping,
        } => cmd_extract(&config, input, out, mapping),
        Command::Update {
            input,
            mapping,
            limit,
            dry_run,
        } => cmd_update(&config, input, mapping, limit, dry_run).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(cli.config.as_deref()),
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_export(
    config: &AppConfig,
    inputs: Vec<String>,
    out: PathBuf,
    mapping: Option<PathBuf>,
    limit: Option<usize>,
    overwrite: bool,
) -> Result<()> {
    let export_config = ExportConfig {
        inputs,
        output: out,
        mapping,
        limit,
        overwrite,
        labels: config.labels.clone(),
    };

    info!(inputs = export_config.inputs.len(), "exporting notes");

    let reporter = CliProgress::new();
    let result = export_notes(&export_config, &reporter);
    reporter.finish();
    let result = result?;

    println!("Rows: {}", result.rows);
    println!("Output: {}", result.output.display());
    Ok(())
}

fn cmd_extract(
    config: &AppConfig,
    input: PathBuf,
    out: PathBuf,
    mapping: Option<PathBuf>,
) -> Result<()> {
    let extract_config = ExtractConfig {
        input,
        output: out,
        mapping,
        labels: config.labels.clone(),
    };

    let reporter = CliProgress::new();
    let result = extract_notes(&extract_config, &reporter);
    reporter.finish();
    let result = result?;

    println!("Rows: {}", result.rows);
    println!("With noteId: {}", result.mapped);
    println!("Without labels: {}", result.unlabeled.len());
    println!("Output: {}", result.output.display());
    Ok(())
}

async fn cmd_update(
    config: &AppConfig,
    input: PathBuf,
    mapping: Option<PathBuf>,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let sync = SyncConfig::from(config);
    let client = AnkiConnectClient::new(
        config.anki.endpoint()?,
        &ClientOptions {
            timeout: sync.lookup_timeout,
            api_version: config.anki.api_version,
        },
    )?;

    let update_config = UpdateConfig {
        input,
        mapping,
        limit,
        dry_run,
        sync,
        answer_field: config.fields.answer_field.clone(),
        preview: config.preview.clone(),
    };

    info!(url = %client.url(), dry_run, "updating notes");

    let reporter = CliProgress::new();
    let result = run_update(&client, &update_config, &reporter).await;
    reporter.finish();
    let result = result?;

    for line in &result.preview {
        println!("{line}");
    }

    println!();
    println!("  Rows:      {}", result.rows);
    println!("  Prepared:  {}", result.prepared);
    println!("  Skipped:   {}", result.skipped.len());
    if result.dry_run {
        println!("  Sent:      0 (dry run)");
    } else {
        println!("  Sent:      {}", result.sent);
        println!("  Failed:    {}", result.failed.len());
    }
    println!("  Ambiguous: {}", result.ambiguous.len());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> Result<()> {
    let path = match path {
        Some(path) => write_default_config(path)?,
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn write_default_config(path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CardfeedError::io(parent, e))?;
    }
    let content = toml::to_string_pretty(&AppConfig::default())?;
    std::fs::write(path, content).map_err(|e| CardfeedError::io(path, e))?;
    Ok(path.to_path_buf())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn note_loaded(&self, path: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Rendering [{current}/{total}] {}", path.display()));
    }

    fn update_sent(&self, note_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Updating [{current}/{total}] {note_id}"));
    }
}
