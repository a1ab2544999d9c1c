// Report column names and the column specs each view resolves.

use ratebook_core::ColumnSpec;

pub const SUPPLY_ID: &str = "supply__id";
pub const SUPPLY_RATE: &str = "supply__dimension_dict__rate";
pub const SUPPLY_INVENTORY: &str = "supply__metrics_data__inventory";
pub const SUPPLY_CPD_IMPRESSIONS: &str = "supply__metrics_data__cpd_impressions";
pub const SUPPLY_BU: &str = "supply__dimension_dict__bu";
pub const SUPPLY_PROPERTY: &str = "supply__dimension_dict__property";
pub const SUPPLY_DATE: &str = "supply__date";
pub const REVENUE_TYPE: &str = "supply__dimension_dict__revenue_type";
/// Business unit of the allocation side of a row.
pub const ALLOCATION_BU: &str = "dimension_dict__bu";

pub const ALLOCATION_ID_CANDIDATES: [&str; 4] = ["id", "allocation_id", "allocation__id", "alloc_id"];
pub const IMPRESSIONS_CANDIDATES: [&str; 3] = [
    "metrics_data__impressions",
    "impressions",
    "allocation__metrics_data__impressions",
];

pub fn supply_id() -> ColumnSpec {
    ColumnSpec::required(SUPPLY_ID, "supply__id column not found")
}

pub fn supply_rate() -> ColumnSpec {
    ColumnSpec::required(SUPPLY_RATE, "supply__dimension_dict__rate column not found")
}

pub fn supply_inventory() -> ColumnSpec {
    ColumnSpec::required(SUPPLY_INVENTORY, "supply__metrics_data__inventory column not found")
}

pub fn allocation_id() -> ColumnSpec {
    ColumnSpec::any_of(&ALLOCATION_ID_CANDIDATES, "No allocation ID column found")
}

pub fn allocation_impressions() -> ColumnSpec {
    ColumnSpec::any_of(&IMPRESSIONS_CANDIDATES, "No impressions column found")
}

/// Optional display columns a view may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    SupplyBu,
    AllocationBu,
    Property,
    Date,
}

impl ContextField {
    pub fn column(self) -> &'static str {
        match self {
            Self::SupplyBu => SUPPLY_BU,
            Self::AllocationBu => ALLOCATION_BU,
            Self::Property => SUPPLY_PROPERTY,
            Self::Date => SUPPLY_DATE,
        }
    }

    pub fn spec(self) -> ColumnSpec {
        ColumnSpec::optional(self.column())
    }
}
