//! `rbook prepare` and `rbook export`: report views from the command line.

use std::path::{Path, PathBuf};

use ratebook_config::Settings;
use ratebook_core::Severity;
use ratebook_recon::{RowEdit, Session, SessionError, ViewKind};

use crate::exit_codes::{EXIT_EDITS_UNKNOWN, EXIT_ERROR, EXIT_EXPORT, EXIT_VIEW_UNAVAILABLE};
use crate::{read_table, report_options, CliError, FilterArgs};

fn session_err(err: SessionError) -> CliError {
    let code = match &err {
        SessionError::ViewNotPrepared(_) | SessionError::NoReport(_) => EXIT_VIEW_UNAVAILABLE,
        SessionError::Export(_) => EXIT_EXPORT,
        SessionError::Rejected(_) => EXIT_ERROR,
        SessionError::Render(_) => EXIT_ERROR,
    };
    let hint = match &err {
        SessionError::ViewNotPrepared(kind) => Some(format!(
            "the report has no {} rows after filtering",
            kind.pricing()
        )),
        _ => None,
    };
    CliError {
        code,
        message: err.to_string(),
        hint,
    }
}

fn load_session(settings: &Settings, report: &Path, filters: FilterArgs) -> Result<Session, CliError> {
    let raw = read_table(report)?;
    let mut session = Session::new(report_options(settings, filters));
    session.load_report(&raw);
    Ok(session)
}

/// Print collected notices to stderr.
fn print_notices(session: &Session) {
    for notice in session.notices().iter() {
        eprintln!("{}: {}", notice.severity, notice.message);
    }
}

pub fn cmd_prepare(settings: &Settings, report: PathBuf, json: bool, filters: FilterArgs) -> Result<(), CliError> {
    let session = load_session(settings, &report, filters)?;
    let summary = session.summary().unwrap_or_default();

    if json {
        let mut views = serde_json::Map::new();
        for kind in ViewKind::ALL {
            if session.is_prepared(kind) {
                views.insert(kind.to_string(), session.render(kind).map_err(session_err)?);
            }
        }
        let out = serde_json::json!({
            "summary": summary,
            "views": views,
            "notices": session.notices(),
        });
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    print_notices(&session);
    println!(
        "{} records: {} CPD, {} CPM",
        summary.total_records, summary.cpd_records, summary.cpm_records
    );
    for kind in ViewKind::ALL {
        let rows = match session.render(kind) {
            Ok(value) => value["rows"].as_array().map_or(0, Vec::len),
            Err(_) => continue,
        };
        println!("  {:<16} {:>6} rows", kind.as_str(), rows);
    }

    let errors = session.notices().messages_at_least(Severity::Error).len();
    if errors > 0 {
        eprintln!("{errors} view(s) could not be prepared");
    }
    Ok(())
}

pub fn cmd_export(
    settings: &Settings,
    report: PathBuf,
    view: ViewKind,
    edits: Option<PathBuf>,
    out: Option<PathBuf>,
    strict: bool,
    filters: FilterArgs,
) -> Result<(), CliError> {
    if strict && edits.is_none() {
        return Err(CliError::args("--strict requires --edits"));
    }
    let mut session = load_session(settings, &report, filters)?;
    print_notices(&session);
    if !session.is_prepared(view) {
        return Err(session_err(SessionError::ViewNotPrepared(view)));
    }

    if let Some(path) = edits {
        let edits = read_edits(&path, view)?;
        let unknown = session.apply_edits(view, &edits).map_err(session_err)?;
        if !unknown.is_empty() {
            let listed = unknown.join(", ");
            if strict {
                return Err(CliError::new(EXIT_EDITS_UNKNOWN, format!("{view} has no rows for: {listed}"))
                    .with_hint("check the ids against `rbook prepare --json`"));
            }
            eprintln!("warning: ignored edits for unknown ids: {listed}");
        }
    }

    let payload = session.export(view).map_err(session_err)?;
    if payload.is_empty() {
        eprintln!("No changes to export for {view}");
    }
    if view == ViewKind::CpdImpression {
        if let Some(changed) = session.impression_rate_changes() {
            eprintln!("{changed} rate change(s) in {view}");
        }
    }

    match out {
        None => print!("{}", payload.content),
        Some(path) => {
            let target = if path.is_dir() {
                path.join(&payload.file_name)
            } else {
                path
            };
            std::fs::write(&target, &payload.content)
                .map_err(|e| CliError::io(format!("{}: {e}", target.display())))?;
            eprintln!("Wrote {} changed row(s) to {}", payload.row_count, target.display());
        }
    }
    Ok(())
}

/// Read an edits file: `id` plus `value`, and for the impression view an
/// optional `rate`. A blank cell leaves that field as it is.
fn read_edits(path: &Path, view: ViewKind) -> Result<Vec<RowEdit>, CliError> {
    let table = read_table(path)?;
    let id_col = table.column_index("id");
    let value_col = table.column_index("value");
    let rate_col = table.column_index("rate");

    let Some(id_col) = id_col.filter(|_| value_col.is_some() || rate_col.is_some()) else {
        return Err(CliError::parse(format!("{}: expected `id` and `value` columns", path.display()))
            .with_hint("edits files start with the header `id,value`"));
    };
    if rate_col.is_some() && view != ViewKind::CpdImpression {
        return Err(CliError::args(format!(
            "{}: a `rate` column only applies to {}",
            path.display(),
            ViewKind::CpdImpression
        )));
    }

    let number = |raw: &str, row: usize| -> Result<Option<f64>, CliError> {
        if raw.is_empty() {
            return Ok(None);
        }
        let value: f64 = raw
            .parse()
            .map_err(|_| CliError::parse(format!("{}: row {row}: '{raw}' is not a number", path.display())))?;
        if !value.is_finite() {
            return Err(CliError::parse(format!("{}: row {row}: value must be finite", path.display())));
        }
        Ok(Some(value))
    };

    table
        .records()
        .map(|record| {
            let row = record.index() + 2;
            Ok::<_, CliError>(RowEdit {
                id: record.at(id_col).trim().to_string(),
                value: value_col.map(|c| number(record.at(c).trim(), row)).transpose()?.flatten(),
                rate: rate_col.map(|c| number(record.at(c).trim(), row)).transpose()?.flatten(),
            })
        })
        .collect()
}
