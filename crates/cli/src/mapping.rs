//! `rbook validate` and `rbook match`: canonicalization against master lists.

use std::path::{Path, PathBuf};

use ratebook_config::Settings;
use ratebook_core::RawTable;
use ratebook_mapping::{validate_records, Category, IngestionLog, Mapper, MasterLists, MatchResult};
use serde::Serialize;

use crate::exit_codes::{EXIT_ERROR, EXIT_VALIDATE_FLAGGED};
use crate::{match_options, read_table, read_text, CliError};

/// Read each master file as one sheet named after its file stem.
fn load_masters(paths: &[PathBuf]) -> Result<MasterLists, CliError> {
    let mut sheets: Vec<(String, RawTable)> = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        sheets.push((name, read_table(path)?));
    }

    let lists = MasterLists::from_sheets(sheets.iter().map(|(name, table)| (name.as_str(), table)));
    if !lists.is_loaded() {
        return Err(CliError::parse("no master list values found")
            .with_hint("name files or columns after a category: property, page, business unit (bu), event"));
    }
    Ok(lists)
}

fn to_json(value: &impl Serialize) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))
}

pub fn cmd_validate(settings: &Settings, records: PathBuf, masters: Vec<PathBuf>, json: bool) -> Result<(), CliError> {
    let log = read_records(&records)?;
    let lists = load_masters(&masters)?;
    let mapper = Mapper::new(match_options(settings));
    let report = validate_records(log.records(), &lists, &mapper);

    if json {
        println!("{}", to_json(&report)?);
    } else {
        println!(
            "{} record(s) checked, {} need review",
            report.records_checked,
            report.flagged_records()
        );
        for entry in &report.entries {
            for issue in &entry.issues {
                let hint = if issue.suggestions.is_empty() {
                    String::new()
                } else {
                    format!(" (did you mean: {})", issue.suggestions.join(", "))
                };
                println!("  record {}: {} '{}' not in master list{}", entry.record_index + 1, issue.field, issue.value, hint);
            }
        }
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::silent(EXIT_VALIDATE_FLAGGED))
    }
}

fn read_records(path: &Path) -> Result<IngestionLog, CliError> {
    let text = read_text(path)?;
    IngestionLog::from_csv(&text).map_err(|e| {
        CliError::parse(format!("{}: {e}", path.display()))
            .with_hint("expected columns: date,event,bu,property,page,supply,allocation,impressions,rate,price_type")
    })
}

#[derive(Serialize)]
struct CategoryMatch {
    category: Category,
    #[serde(flatten)]
    result: MatchResult,
}

pub fn cmd_match(
    settings: &Settings,
    value: String,
    masters: Vec<PathBuf>,
    category: Option<Category>,
    json: bool,
) -> Result<(), CliError> {
    let lists = load_masters(&masters)?;
    let mapper = Mapper::new(match_options(settings));

    let categories: Vec<Category> = match category {
        Some(c) => vec![c],
        None => Category::ALL
            .into_iter()
            .filter(|c| !lists.get(*c).is_empty())
            .collect(),
    };

    let results: Vec<CategoryMatch> = categories
        .into_iter()
        .map(|category| CategoryMatch {
            category,
            result: mapper.validate_and_suggest(&value, lists.get(category)),
        })
        .collect();

    if json {
        println!("{}", to_json(&results)?);
        return Ok(());
    }

    for m in &results {
        let status = if m.result.is_valid { "ok" } else { "no match" };
        println!("{:<9} {} -> {} [{}]", m.category.to_string(), value, m.result.matched_value, status);
        for s in &m.result.suggestions {
            println!("          {:>5.1}  {}", s.score, s.value);
        }
    }
    Ok(())
}
