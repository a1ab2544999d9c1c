//! Master lists: the canonical accepted values per category.

use std::collections::HashSet;
use std::ops::Deref;

use ratebook_core::RawTable;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "property")]
    Property,
    #[serde(rename = "page")]
    Page,
    #[serde(rename = "bu")]
    BusinessUnit,
    #[serde(rename = "event")]
    Event,
}

impl Category {
    /// Order in which records are validated and sheets are classified.
    pub const ALL: [Category; 4] = [
        Category::Property,
        Category::Page,
        Category::BusinessUnit,
        Category::Event,
    ];

    /// Record field name for this category.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Page => "page",
            Self::BusinessUnit => "bu",
            Self::Event => "event",
        }
    }

    /// Substrings identifying a sheet or column holding this category.
    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Property => &["property", "properties"],
            Self::Page => &["page", "pages"],
            Self::BusinessUnit => &["business unit", "business_unit", "bu"],
            Self::Event => &["event", "events"],
        }
    }

    fn matches(&self, name: &str) -> bool {
        let lowered = name.trim().to_lowercase();
        self.keywords().iter().any(|k| lowered.contains(k))
    }

    fn is_header_echo(&self, value: &str) -> bool {
        let lowered = value.to_lowercase();
        self.keywords().iter().any(|k| *k == lowered)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field())
    }
}

// ---------------------------------------------------------------------------
// MasterList
// ---------------------------------------------------------------------------

/// Ordered canonical strings for one category. Order is preserved as given;
/// it breaks similarity ties but carries no other meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MasterList(Vec<String>);

impl MasterList {
    /// Drop case-insensitive duplicates (first spelling wins) and sort
    /// case-insensitively.
    pub fn normalized(values: Vec<String>) -> Self {
        let mut seen = HashSet::new();
        let mut unique: Vec<String> = values
            .into_iter()
            .filter(|v| seen.insert(v.to_lowercase()))
            .collect();
        unique.sort_by_key(|v| v.to_lowercase());
        Self(unique)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Deref for MasterList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<&str>> for MasterList {
    fn from(values: Vec<&str>) -> Self {
        Self(values.into_iter().map(str::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// MasterLists
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MasterLists {
    pub properties: MasterList,
    pub pages: MasterList,
    pub business_units: MasterList,
    pub events: MasterList,
}

impl MasterLists {
    pub fn get(&self, category: Category) -> &MasterList {
        match category {
            Category::Property => &self.properties,
            Category::Page => &self.pages,
            Category::BusinessUnit => &self.business_units,
            Category::Event => &self.events,
        }
    }

    pub fn set(&mut self, category: Category, list: MasterList) {
        match category {
            Category::Property => self.properties = list,
            Category::Page => self.pages = list,
            Category::BusinessUnit => self.business_units = list,
            Category::Event => self.events = list,
        }
    }

    /// True when at least one category has entries.
    pub fn is_loaded(&self) -> bool {
        Category::ALL.iter().any(|c| !self.get(*c).is_empty())
    }

    pub fn counts(&self) -> [(Category, usize); 4] {
        Category::ALL.map(|c| (c, self.get(c).len()))
    }

    /// Build master lists from already-read workbook sheets.
    ///
    /// A sheet whose name names a category contributes every non-blank cell
    /// of every column (cells that merely repeat the category name are
    /// skipped). Other sheets are scanned column by column, and a column
    /// whose header names a category contributes its cells. Each list is
    /// then de-duplicated and sorted case-insensitively.
    pub fn from_sheets<'a>(sheets: impl IntoIterator<Item = (&'a str, &'a RawTable)>) -> Self {
        let mut collected: [Vec<String>; 4] = Default::default();

        for (sheet_name, table) in sheets {
            if let Some(pos) = Category::ALL.iter().position(|c| c.matches(sheet_name)) {
                let category = Category::ALL[pos];
                for col in 0..table.columns().len() {
                    collected[pos].extend(
                        column_values(table, col)
                            .into_iter()
                            .filter(|v| !category.is_header_echo(v)),
                    );
                }
                continue;
            }

            for (col, header) in table.columns().iter().enumerate() {
                if let Some(pos) = Category::ALL.iter().position(|c| c.matches(header)) {
                    collected[pos].extend(column_values(table, col));
                }
            }
        }

        let mut lists = MasterLists::default();
        for (category, values) in Category::ALL.into_iter().zip(collected) {
            lists.set(category, MasterList::normalized(values));
        }
        tracing::debug!(counts = ?lists.counts(), "loaded master lists");
        lists
    }
}

/// Distinct trimmed non-blank cells of one column, first-seen order.
fn column_values(table: &RawTable, col: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    table
        .records()
        .map(|r| r.at(col).trim())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_string()))
        .map(str::to_string)
        .collect()
}
