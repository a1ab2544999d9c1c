//! Declarative column resolution for schema-flexible reports.
//!
//! A [`ColumnSpec`] names the columns a field may live under, in priority
//! order. Resolution is deterministic: the first candidate present in the
//! schema wins. Specs that allow it then fall back to a substring scan over
//! the actual columns, which is permissive by nature: with several partial
//! matches the first column in schema order is taken, and that is not
//! guaranteed to be the intended one.

use crate::table::RawTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// The dependent view cannot be built without this column.
    Required,
    /// Context only; silently skipped when absent.
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Only the listed candidates are accepted.
    Exact,
    /// Accept the first column containing the last `__` token of a candidate.
    Substring,
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    candidates: Vec<String>,
    missing_message: String,
    presence: Presence,
    fallback: Fallback,
}

/// Outcome of resolving a [`ColumnSpec`] against a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A listed candidate is present.
    Exact(&'a str),
    /// No candidate is present; a column matched by substring instead.
    Fallback(&'a str),
    Absent,
}

impl<'a> Resolution<'a> {
    pub fn column(&self) -> Option<&'a str> {
        match *self {
            Self::Exact(c) | Self::Fallback(c) => Some(c),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl ColumnSpec {
    /// A single required column with no fallback.
    pub fn required(name: &str, missing_message: impl Into<String>) -> Self {
        Self {
            candidates: vec![name.to_string()],
            missing_message: missing_message.into(),
            presence: Presence::Required,
            fallback: Fallback::Exact,
        }
    }

    /// A context column included only when present.
    pub fn optional(name: &str) -> Self {
        Self {
            candidates: vec![name.to_string()],
            missing_message: format!("{name} column not found"),
            presence: Presence::Optional,
            fallback: Fallback::Exact,
        }
    }

    /// Required field with several candidate names and substring fallback.
    pub fn any_of(candidates: &[&str], missing_message: impl Into<String>) -> Self {
        Self {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
            missing_message: missing_message.into(),
            presence: Presence::Required,
            fallback: Fallback::Substring,
        }
    }

    pub fn missing_message(&self) -> &str {
        &self.missing_message
    }

    /// Resolve against the table's schema.
    pub fn resolve<'t>(&self, table: &'t RawTable) -> Resolution<'t> {
        let columns = table.columns();

        for candidate in &self.candidates {
            if let Some(col) = columns.iter().find(|c| *c == candidate) {
                return Resolution::Exact(col.as_str());
            }
        }

        if self.fallback == Fallback::Substring {
            let tokens: Vec<String> = self
                .candidates
                .iter()
                .map(|c| last_token(c).to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();

            if let Some(col) = columns.iter().find(|col| {
                let lowered = col.to_lowercase();
                tokens.iter().any(|t| lowered.contains(t.as_str()))
            }) {
                tracing::debug!(
                    column = col.as_str(),
                    candidates = ?self.candidates,
                    "resolved column by substring fallback"
                );
                return Resolution::Fallback(col.as_str());
            }
        }

        if self.presence == Presence::Required {
            tracing::warn!(candidates = ?self.candidates, "{}", self.missing_message);
        }
        Resolution::Absent
    }
}

/// Final `__`-delimited segment of a column name.
fn last_token(name: &str) -> &str {
    name.rsplit("__").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(cols: &[&str]) -> RawTable {
        RawTable::from_rows(cols, &[])
    }

    #[test]
    fn first_present_candidate_wins() {
        let table = schema(&["impressions", "metrics_data__impressions"]);
        let spec = ColumnSpec::any_of(&["metrics_data__impressions", "impressions"], "none");
        assert_eq!(spec.resolve(&table), Resolution::Exact("metrics_data__impressions"));
    }

    #[test]
    fn substring_fallback_uses_last_token() {
        let table = schema(&["supply__date", "Allocation_Impressions_Total"]);
        let spec = ColumnSpec::any_of(&["allocation__metrics_data__impressions"], "none");
        assert_eq!(spec.resolve(&table), Resolution::Fallback("Allocation_Impressions_Total"));
    }

    #[test]
    fn fallback_scans_in_schema_order() {
        let table = schema(&["date", "supply__id", "alloc_uid"]);
        let spec = ColumnSpec::any_of(&["allocation_id", "allocation__id"], "none");
        assert_eq!(spec.resolve(&table), Resolution::Fallback("supply__id"));
    }

    #[test]
    fn exact_spec_never_falls_back() {
        let table = schema(&["allocation__supply__id"]);
        let spec = ColumnSpec::required("supply__id", "supply__id column not found");
        assert!(spec.resolve(&table).is_absent());
    }

    #[test]
    fn absent_required_column() {
        let table = schema(&["date"]);
        let spec = ColumnSpec::any_of(&["metrics_data__impressions"], "No impressions column found");
        assert!(spec.resolve(&table).is_absent());
        assert_eq!(spec.missing_message(), "No impressions column found");
    }

    #[test]
    fn optional_column_is_exact_only() {
        let table = schema(&["supply__date_local"]);
        let spec = ColumnSpec::optional("supply__date");
        assert!(spec.resolve(&table).is_absent());
        assert_eq!(spec.resolve(&schema(&["supply__date"])), Resolution::Exact("supply__date"));
    }
}
