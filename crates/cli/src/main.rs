// ratebook CLI - headless report preparation, export and validation

mod exit_codes;
mod mapping;
mod views;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use ratebook_config::{ConfigError, Settings};
use ratebook_core::{RawTable, TableError};
use ratebook_mapping::{Category, MatchOptions};
use ratebook_recon::{ReportOptions, ViewKind};
use tracing_subscriber::{fmt, EnvFilter};

use exit_codes::{EXIT_CONFIG, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "rbook")]
#[command(about = "Prepare, edit-export and validate report reconciliation data (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (defaults to <config dir>/ratebook/settings.toml)
    #[arg(long, global = true, env = "RBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug detail to stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a report into CPD/CPM partitions and derive every editable view
    #[command(after_help = "\
Examples:
  rbook prepare report.csv
  rbook prepare report.csv --json
  rbook prepare report.csv --property Sports --bu Retail")]
    Prepare {
        /// Report CSV (header row first)
        report: PathBuf,

        /// Output summary, views and notices as one JSON value
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Apply edits to one view and write its change-only export
    #[command(after_help = "\
Examples:
  rbook export report.csv --view cpd-rate --edits rates.csv
  rbook export report.csv --view cpm-supply --edits adds.csv --out exports/
  rbook export report.csv --view cpd-impression --edits impressions.csv -o update.csv

Edits files have an `id,value` header. The value sets the view's editable
field: the new rate, or the amount to add for slot and impression views.
For cpd-impression an extra `rate` column sets the proposed rate; blank
cells leave a field unchanged.")]
    Export {
        /// Report CSV (header row first)
        report: PathBuf,

        /// View to export
        #[arg(long, value_parser = parse_view)]
        view: ViewKind,

        /// CSV of `id,value[,rate]` edits to apply before exporting
        #[arg(long)]
        edits: Option<PathBuf>,

        /// Output file or directory (omit for stdout)
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Fail when an edit references an id the view does not contain
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Check ingestion records against master lists
    #[command(after_help = "\
Examples:
  rbook validate records.csv --masters properties.csv --masters pages.csv
  rbook validate records.csv --masters masters/*.csv --json

Each master file is one sheet; its file name (or column names) decide the
category: property, page, business unit (bu) or event.")]
    Validate {
        /// Records CSV (date,event,bu,property,page,supply,allocation,impressions,rate,price_type)
        records: PathBuf,

        /// Master list CSV files
        #[arg(long, required = true, num_args = 1..)]
        masters: Vec<PathBuf>,

        /// Output the validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Find the canonical spelling of a value and suggestions
    #[command(name = "match", after_help = "\
Examples:
  rbook match 'Mbs Store' --masters properties.csv
  rbook match 'homepage' --masters pages.csv --category page --json")]
    Match {
        /// Value as typed
        value: String,

        /// Master list CSV files
        #[arg(long, required = true, num_args = 1..)]
        masters: Vec<PathBuf>,

        /// Only match against this category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Report filters. When given, they replace the filters from settings.
#[derive(clap::Args, Clone, Default)]
struct FilterArgs {
    /// Keep only rows of this property (repeatable)
    #[arg(long = "property", value_name = "NAME")]
    properties: Vec<String>,

    /// Keep only rows of this allocation business unit (repeatable)
    #[arg(long = "bu", value_name = "NAME")]
    business_units: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Property,
    Page,
    Bu,
    Event,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Property => Category::Property,
            CategoryArg::Page => Category::Page,
            CategoryArg::Bu => Category::BusinessUnit,
            CategoryArg::Event => Category::Event,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nbuild:   ", env!("RBOOK_PROFILE"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn parse_view(s: &str) -> Result<ViewKind, String> {
    s.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: rbook <command> [options]");
            eprintln!("       rbook --help for more information");
            Ok(())
        }
        Some(Commands::Prepare { report, json, filters }) => {
            load_settings(cli.config.as_deref()).and_then(|s| views::cmd_prepare(&s, report, json, filters))
        }
        Some(Commands::Export {
            report,
            view,
            edits,
            out,
            strict,
            filters,
        }) => load_settings(cli.config.as_deref())
            .and_then(|s| views::cmd_export(&s, report, view, edits, out, strict, filters)),
        Some(Commands::Validate { records, masters, json }) => {
            load_settings(cli.config.as_deref()).and_then(|s| mapping::cmd_validate(&s, records, masters, json))
        }
        Some(Commands::Match {
            value,
            masters,
            category,
            json,
        }) => load_settings(cli.config.as_deref())
            .and_then(|s| mapping::cmd_match(&s, value, masters, category.map(Category::from), json)),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Log to stderr so stdout stays clean for CSV and JSON output.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(EXIT_PARSE, msg)
    }

    pub fn config(err: ConfigError) -> Self {
        Self::new(EXIT_CONFIG, err.to_string()).with_hint("fix the settings file or pass --config")
    }

    /// Exit silently with `code`; the command already reported its outcome.
    pub fn silent(code: u8) -> Self {
        Self::new(code, "")
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Settings::from_path(path).map_err(CliError::config),
        None => Ok(Settings::load()),
    }
}

pub(crate) fn match_options(settings: &Settings) -> MatchOptions {
    let m = &settings.matching;
    MatchOptions {
        threshold: m.threshold,
        suggestion_floor: m.suggestion_floor,
        top_n: m.top_n,
        abbreviations: m.abbreviations.iter().map(|a| (a.from.clone(), a.to.clone())).collect(),
    }
}

pub(crate) fn report_options(settings: &Settings, filters: FilterArgs) -> ReportOptions {
    let r = &settings.report;
    let pick = |cli: Vec<String>, configured: &[String]| if cli.is_empty() { configured.to_vec() } else { cli };
    ReportOptions {
        revenue_type_column: r.revenue_type_column.clone(),
        cpd_marker: r.cpd_marker.clone(),
        properties: pick(filters.properties, &r.properties),
        business_units: pick(filters.business_units, &r.business_units),
    }
}

pub(crate) fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {e}", path.display())))
}

pub(crate) fn read_table(path: &Path) -> Result<RawTable, CliError> {
    let text = read_text(path)?;
    RawTable::from_csv_str(&text).map_err(|e| {
        let err = CliError::parse(format!("{}: {e}", path.display()));
        match e {
            TableError::MissingHeader => err.with_hint("the first line must name the columns"),
            TableError::Csv(_) => err,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebook_config::Abbreviation;

    #[test]
    fn cli_filters_replace_configured_filters() {
        let mut settings = Settings::default();
        settings.report.properties = vec!["News".into()];
        settings.report.business_units = vec!["Retail".into()];

        let options = report_options(
            &settings,
            FilterArgs {
                properties: vec!["Sports".into()],
                business_units: Vec::new(),
            },
        );
        assert_eq!(options.properties, vec!["Sports"]);
        assert_eq!(options.business_units, vec!["Retail"]);
    }

    #[test]
    fn match_options_follow_settings() {
        let mut settings = Settings::default();
        settings.matching.threshold = 75.0;
        settings.matching.abbreviations.push(Abbreviation {
            from: "hp".into(),
            to: "Homepage".into(),
        });
        let options = match_options(&settings);
        assert_eq!(options.threshold, 75.0);
        assert_eq!(options.abbreviations.len(), 2);
        assert_eq!(options.abbreviations[1], ("hp".to_string(), "Homepage".to_string()));
    }

    #[test]
    fn view_names_parse() {
        assert_eq!(parse_view("cpm-allocation"), Ok(ViewKind::CpmAllocation));
        assert!(parse_view("allocation").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
