use std::fmt;
use std::str::FromStr;

use serde::Serialize;

// ---------------------------------------------------------------------------
// View identity
// ---------------------------------------------------------------------------

/// Which pricing partition a view is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Cpd,
    Cpm,
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpd => write!(f, "CPD"),
            Self::Cpm => write!(f, "CPM"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    CpdRate,
    CpdSupply,
    CpdAllocation,
    CpdImpression,
    CpmSupply,
    CpmAllocation,
    CpmRate,
}

impl ViewKind {
    pub const ALL: [ViewKind; 7] = [
        Self::CpdRate,
        Self::CpdSupply,
        Self::CpdAllocation,
        Self::CpdImpression,
        Self::CpmSupply,
        Self::CpmAllocation,
        Self::CpmRate,
    ];

    pub fn pricing(self) -> PricingModel {
        match self {
            Self::CpdRate | Self::CpdSupply | Self::CpdAllocation | Self::CpdImpression => {
                PricingModel::Cpd
            }
            Self::CpmSupply | Self::CpmAllocation | Self::CpmRate => PricingModel::Cpm,
        }
    }

    /// Suggested download name for the view's export.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::CpdRate => "cpd_rate_update.csv",
            Self::CpdSupply => "cpd_supply_slot_update.csv",
            Self::CpdAllocation => "cpd_allocation_slot_update.csv",
            Self::CpdImpression => "cpd_impression_update.csv",
            Self::CpmSupply => "cpm_supply_inventory_update.csv",
            Self::CpmAllocation => "cpm_allocation_impressions_update.csv",
            Self::CpmRate => "cpm_rate_update.csv",
        }
    }

    /// Stable name used on the command line and in JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CpdRate => "cpd-rate",
            Self::CpdSupply => "cpd-supply",
            Self::CpdAllocation => "cpd-allocation",
            Self::CpdImpression => "cpd-impression",
            Self::CpmSupply => "cpm-supply",
            Self::CpmAllocation => "cpm-allocation",
            Self::CpmRate => "cpm-rate",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown view '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Display-only columns carried alongside a row. Never exported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_bu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// CPD supply rate under carry-forward: `new_rate` starts equal to the original.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRow {
    pub id: String,
    pub original_rate: i64,
    pub new_rate: i64,
    #[serde(flatten)]
    pub context: RowContext,
}

/// Supply inventory under the additive policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyRow {
    pub id: String,
    pub inventory: i64,
    pub new_inventory: i64,
    pub total_inventory: i64,
    #[serde(flatten)]
    pub context: RowContext,
}

/// Allocation impressions under the additive policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRow {
    pub id: String,
    pub impressions: i64,
    pub new_impressions: i64,
    pub total_impressions: i64,
    #[serde(flatten)]
    pub context: RowContext,
}

/// CPD supply with both a proposed rate (carry-forward) and cumulative
/// impressions to add (additive).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpressionRow {
    pub id: String,
    pub rate: i64,
    pub new_rate: i64,
    pub cpd_impressions: i64,
    /// Current value of the report's CPD impressions metric, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_cpd_impressions: Option<i64>,
    #[serde(flatten)]
    pub context: RowContext,
}

/// CPM supply rate. Additive: a new rate of zero means "no change".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpmRateRow {
    pub id: String,
    pub original_rate: f64,
    pub new_rate: f64,
    #[serde(flatten)]
    pub context: RowContext,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A derived, editable table. Rows are only ever replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewTable<R> {
    kind: ViewKind,
    rows: Vec<R>,
}

impl<R> ViewTable<R> {
    pub fn new(kind: ViewKind, rows: Vec<R>) -> Self {
        Self { kind, rows }
    }

    pub fn empty(kind: ViewKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
