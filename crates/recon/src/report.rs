//! Report preparation: optional property and business-unit filters, then
//! the split into CPD and CPM partitions.

use ratebook_core::{Notices, RawTable};
use serde::Serialize;

use crate::schema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Column holding the revenue type.
    pub revenue_type_column: String,
    /// Case-insensitive substring marking a CPD row.
    pub cpd_marker: String,
    /// Keep only these properties (empty keeps all).
    pub properties: Vec<String>,
    /// Keep only these allocation business units (empty keeps all).
    pub business_units: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            revenue_type_column: schema::REVENUE_TYPE.to_string(),
            cpd_marker: "cpd".to_string(),
            properties: Vec::new(),
            business_units: Vec::new(),
        }
    }
}

/// Rows of each pricing model. A partition with no rows is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partitions {
    pub cpd: Option<RawTable>,
    pub cpm: Option<RawTable>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total_records: usize,
    pub cpd_records: usize,
    pub cpm_records: usize,
}

/// Apply the configured filters. A filter on a column the report does not
/// have keeps nothing.
pub fn filter_report(raw: &RawTable, options: &ReportOptions, notices: &mut Notices) -> RawTable {
    let mut table = raw.clone();
    let filters = [
        (schema::SUPPLY_PROPERTY, &options.properties),
        (schema::ALLOCATION_BU, &options.business_units),
    ];

    for (column, allowed) in filters {
        if allowed.is_empty() {
            continue;
        }
        if !table.has_column(column) {
            tracing::warn!(column, "cannot filter on a missing column");
            notices.warning(format!("{column} column not found; no rows match the filter"));
            return RawTable::new(table.columns().to_vec(), Vec::new());
        }
        table = table.filter(|r| r.get(column).is_some_and(|v| allowed.iter().any(|a| a == v)));
    }

    if table.len() != raw.len() {
        tracing::debug!(kept = table.len(), total = raw.len(), "filtered report");
    }
    table
}

/// Split rows by revenue type. Without the revenue type column every row
/// is treated as CPM.
pub fn split(raw: &RawTable, options: &ReportOptions, notices: &mut Notices) -> Partitions {
    let non_empty = |t: RawTable| (!t.is_empty()).then_some(t);

    if !raw.has_column(&options.revenue_type_column) {
        tracing::warn!(column = %options.revenue_type_column, "revenue type column missing, treating all rows as CPM");
        notices.warning(format!(
            "{} column not found; all rows treated as CPM",
            options.revenue_type_column
        ));
        return Partitions {
            cpd: None,
            cpm: non_empty(raw.clone()),
        };
    }

    let marker = options.cpd_marker.to_lowercase();
    let column = options.revenue_type_column.as_str();
    let is_cpd = |r: &ratebook_core::RawRecord<'_>| {
        r.get(column).is_some_and(|v| v.to_lowercase().contains(&marker))
    };

    Partitions {
        cpd: non_empty(raw.filter(|r| is_cpd(r))),
        cpm: non_empty(raw.filter(|r| !is_cpd(r))),
    }
}

/// Filter then split, returning the partitions and their row counts.
pub fn prepare(raw: &RawTable, options: &ReportOptions, notices: &mut Notices) -> (Partitions, ReportSummary) {
    let filtered = filter_report(raw, options, notices);
    if filtered.is_empty() {
        notices.info("No data found for the selected filters");
    }
    let partitions = split(&filtered, options, notices);

    let summary = ReportSummary {
        total_records: filtered.len(),
        cpd_records: partitions.cpd.as_ref().map_or(0, RawTable::len),
        cpm_records: partitions.cpm.as_ref().map_or(0, RawTable::len),
    };
    tracing::info!(
        total = summary.total_records,
        cpd = summary.cpd_records,
        cpm = summary.cpm_records,
        "report prepared"
    );
    (partitions, summary)
}
