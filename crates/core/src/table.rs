// Raw report tables.
//
// A report is a header row plus string cells. Which columns exist depends
// on how the report was configured, so nothing here assumes a schema.

use std::collections::HashSet;

#[derive(Debug)]
pub enum TableError {
    /// The CSV text could not be read.
    Csv(String),
    /// The CSV text has no header row.
    MissingHeader,
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv(msg) => write!(f, "CSV parse error: {msg}"),
            Self::MissingHeader => write!(f, "report has no header row"),
        }
    }
}

impl std::error::Error for TableError {}

/// Fetched report data. Empty cells stand for missing values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table; rows are padded or cut to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Convenience constructor for literal data.
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// Parse already-fetched comma-separated report text (header row first).
    pub fn from_csv_str(content: &str) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| TableError::Csv(e.to_string()))?
            .clone();
        if headers.is_empty() {
            return Err(TableError::MissingHeader);
        }

        let columns: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| TableError::Csv(e.to_string()))?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        Ok(Self::new(columns, rows))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = RawRecord<'_>> {
        (0..self.rows.len()).map(move |index| RawRecord { table: self, index })
    }

    pub fn record(&self, index: usize) -> Option<RawRecord<'_>> {
        (index < self.rows.len()).then_some(RawRecord { table: self, index })
    }

    /// Keep only the rows matching `keep`, preserving order and schema.
    pub fn filter(&self, mut keep: impl FnMut(&RawRecord<'_>) -> bool) -> RawTable {
        let rows = self
            .records()
            .filter(|r| keep(r))
            .map(|r| self.rows[r.index].clone())
            .collect();
        RawTable {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Project the given columns and drop duplicate tuples, keeping the
    /// first occurrence of each in row order.
    pub fn distinct_projection(&self, indices: &[usize]) -> Vec<Vec<String>> {
        let mut seen: HashSet<Vec<&str>> = HashSet::new();
        let mut out = Vec::new();

        for row in &self.rows {
            let tuple: Vec<&str> = indices.iter().map(|&i| row[i].as_str()).collect();
            if seen.insert(tuple.clone()) {
                out.push(tuple.into_iter().map(str::to_string).collect());
            }
        }

        let dropped = self.rows.len() - out.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = out.len(), "dropped duplicate projected rows");
        }
        out
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    table: &'a RawTable,
    index: usize,
}

impl<'a> RawRecord<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell for `column`, or `None` when the schema lacks it.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .column_index(column)
            .map(|i| self.table.rows[self.index][i].as_str())
    }

    pub fn at(&self, column_index: usize) -> &'a str {
        &self.table.rows[self.index][column_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_csv_with_ragged_rows() {
        let table = RawTable::from_csv_str("a,b,c\n1,2,3\n4,5\n").unwrap();
        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.len(), 2);
        let second = table.record(1).unwrap();
        assert_eq!(second.get("b"), Some("5"));
        assert_eq!(second.get("c"), Some(""));
        assert_eq!(second.get("missing"), None);
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(
            RawTable::from_csv_str(""),
            Err(TableError::MissingHeader)
        ));
    }

    #[test]
    fn distinct_projection_keeps_first_seen_order() {
        let table = RawTable::from_rows(
            &["id", "rate", "noise"],
            &[
                &["2", "10", "x"],
                &["1", "10", "y"],
                &["2", "10", "z"],
                &["1", "11", "w"],
            ],
        );
        let rows = table.distinct_projection(&[0, 1]);
        assert_eq!(
            rows,
            vec![
                vec!["2".to_string(), "10".to_string()],
                vec!["1".to_string(), "10".to_string()],
                vec!["1".to_string(), "11".to_string()],
            ]
        );
    }

    #[test]
    fn filter_keeps_schema() {
        let table = RawTable::from_rows(&["id", "kind"], &[&["1", "cpd"], &["2", "cpm"]]);
        let only_cpd = table.filter(|r| r.get("kind") == Some("cpd"));
        assert_eq!(only_cpd.columns(), table.columns());
        assert_eq!(only_cpd.len(), 1);
        assert_eq!(only_cpd.record(0).unwrap().get("id"), Some("1"));
    }
}
