use serde::Serialize;

use crate::ingest::IngestionRecord;
use crate::mapper::Mapper;
use crate::master::{Category, MasterLists};
use crate::similarity::Similarity;

/// One field whose value is not in its master list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: Category,
    pub value: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordIssues {
    pub record_index: usize,
    pub issues: Vec<FieldIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub records_checked: usize,
    /// Only records with at least one issue, in record order.
    pub entries: Vec<RecordIssues>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flagged_records(&self) -> usize {
        self.entries.len()
    }

    pub fn issue_count(&self) -> usize {
        self.entries.iter().map(|e| e.issues.len()).sum()
    }
}

/// Re-check accepted records against the master lists. Categories with an
/// empty master list are skipped. Records are only read.
pub fn validate_records<S: Similarity>(
    records: &[IngestionRecord],
    lists: &MasterLists,
    mapper: &Mapper<S>,
) -> ValidationReport {
    let mut entries = Vec::new();

    for (record_index, record) in records.iter().enumerate() {
        let issues: Vec<FieldIssue> = Category::ALL
            .iter()
            .filter(|c| !lists.get(**c).is_empty())
            .filter_map(|&category| {
                let value = record.field(category);
                let result = mapper.validate_and_suggest(value, lists.get(category));
                (!result.is_valid).then(|| FieldIssue {
                    field: category,
                    value: value.to_string(),
                    suggestions: result.suggestion_values(),
                })
            })
            .collect();

        if !issues.is_empty() {
            entries.push(RecordIssues {
                record_index,
                issues,
            });
        }
    }

    if !entries.is_empty() {
        tracing::info!(flagged = entries.len(), checked = records.len(), "records need review");
    }

    ValidationReport {
        records_checked: records.len(),
        entries,
    }
}
