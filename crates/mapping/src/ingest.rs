//! Manually ingested records.
//!
//! A record is entered as a [`RecordDraft`], checked for required fields,
//! and accepted into an [`IngestionLog`] with its category fields mapped to
//! canonical master-list spellings.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::mapper::Mapper;
use crate::master::{Category, MasterLists};
use crate::similarity::Similarity;

#[derive(Debug)]
pub enum IngestError {
    /// Draft failed field validation; one message per problem.
    Invalid(Vec<String>),
    /// Record CSV could not be read or written.
    Csv(String),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "invalid record: {}", errors.join("; ")),
            Self::Csv(msg) => write!(f, "record CSV error: {msg}"),
        }
    }
}

impl std::error::Error for IngestError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceType {
    #[serde(rename = "CPD")]
    Cpd,
    #[serde(rename = "CPM")]
    Cpm,
    #[serde(rename = "CPC")]
    Cpc,
    Fixed,
}

impl FromStr for PriceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CPD" => Ok(Self::Cpd),
            "CPM" => Ok(Self::Cpm),
            "CPC" => Ok(Self::Cpc),
            "FIXED" => Ok(Self::Fixed),
            other => Err(format!("unknown price type: {other}")),
        }
    }
}

impl std::fmt::Display for PriceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpd => write!(f, "CPD"),
            Self::Cpm => write!(f, "CPM"),
            Self::Cpc => write!(f, "CPC"),
            Self::Fixed => write!(f, "Fixed"),
        }
    }
}

/// Form input before validation. `None` / blank means "not filled in".
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub date: Option<NaiveDate>,
    pub event: String,
    pub bu: String,
    pub property: String,
    pub page: String,
    pub supply: Option<u64>,
    pub allocation: Option<u64>,
    pub impressions: Option<u64>,
    pub rate: Option<f64>,
    pub price_type: Option<PriceType>,
}

/// Problems with a draft, in form order. Empty means the draft is complete.
pub fn validate_draft(draft: &RecordDraft) -> Vec<String> {
    let mut errors = Vec::new();

    if draft.date.is_none() {
        errors.push("Date is required".to_string());
    }
    for (label, value) in [
        ("Event", &draft.event),
        ("Business Unit", &draft.bu),
        ("Property", &draft.property),
        ("Page", &draft.page),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{label} is required"));
        }
    }
    for (label, value) in [
        ("Supply", draft.supply),
        ("Allocation", draft.allocation),
        ("Impressions", draft.impressions),
    ] {
        if value.is_none() {
            errors.push(format!("{label} is required"));
        }
    }
    match draft.rate {
        None => errors.push("Rate is required".to_string()),
        Some(r) if !r.is_finite() || r < 0.0 => {
            errors.push("Rate must be a non-negative number".to_string())
        }
        Some(_) => {}
    }
    if draft.price_type.is_none() {
        errors.push("Price Type is required".to_string());
    }

    errors
}

/// An accepted record. Field names are the fixed ingestion schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRecord {
    pub date: NaiveDate,
    pub event: String,
    pub bu: String,
    pub property: String,
    pub page: String,
    pub supply: u64,
    pub allocation: u64,
    pub impressions: u64,
    pub rate: f64,
    pub price_type: PriceType,
}

impl IngestionRecord {
    /// Text held in the field associated with `category`.
    pub fn field(&self, category: Category) -> &str {
        match category {
            Category::Property => &self.property,
            Category::Page => &self.page,
            Category::BusinessUnit => &self.bu,
            Category::Event => &self.event,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IngestionSummary {
    pub total_records: usize,
    pub total_supply: u64,
    pub total_allocation: u64,
    pub total_impressions: u64,
}

/// Records accepted during one session, in entry order.
#[derive(Debug, Clone, Default)]
pub struct IngestionLog {
    records: Vec<IngestionRecord>,
}

impl IngestionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[IngestionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Validate the draft and append it, mapping event, business unit,
    /// property and page to their best master-list spelling. Values with
    /// no good match are kept as typed.
    pub fn add<S: Similarity>(
        &mut self,
        draft: &RecordDraft,
        mapper: &Mapper<S>,
        lists: &MasterLists,
    ) -> Result<&IngestionRecord, IngestError> {
        let errors = validate_draft(draft);
        let (Some(date), Some(supply), Some(allocation), Some(impressions), Some(rate), Some(price_type)) = (
            draft.date,
            draft.supply,
            draft.allocation,
            draft.impressions,
            draft.rate,
            draft.price_type,
        ) else {
            return Err(IngestError::Invalid(errors));
        };
        if !errors.is_empty() {
            return Err(IngestError::Invalid(errors));
        }

        let map = |category: Category, value: &str| mapper.find_best_match(value, lists.get(category));
        let record = IngestionRecord {
            date,
            event: map(Category::Event, &draft.event),
            bu: map(Category::BusinessUnit, &draft.bu),
            property: map(Category::Property, &draft.property),
            page: map(Category::Page, &draft.page),
            supply,
            allocation,
            impressions,
            rate,
            price_type,
        };
        tracing::info!(index = self.records.len(), event = %record.event, property = %record.property, "record added");
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// Remove the records at `indices`. Out-of-range and repeated indices
    /// are ignored. Returns how many records were removed.
    pub fn delete(&mut self, indices: &[usize]) -> usize {
        let mut sorted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| i < self.records.len())
            .collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for &i in &sorted {
            self.records.remove(i);
        }
        sorted.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn summary(&self) -> IngestionSummary {
        IngestionSummary {
            total_records: self.records.len(),
            total_supply: self.records.iter().map(|r| r.supply).sum(),
            total_allocation: self.records.iter().map(|r| r.allocation).sum(),
            total_impressions: self.records.iter().map(|r| r.impressions).sum(),
        }
    }

    /// Serialize all records with a header row.
    pub fn to_csv(&self) -> Result<String, IngestError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.records.is_empty() {
            writer
                .write_record(RECORD_HEADERS)
                .map_err(|e| IngestError::Csv(e.to_string()))?;
        }
        for record in &self.records {
            writer
                .serialize(record)
                .map_err(|e| IngestError::Csv(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| IngestError::Csv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| IngestError::Csv(e.to_string()))
    }

    /// Read records written by [`to_csv`](Self::to_csv).
    pub fn from_csv(content: &str) -> Result<Self, IngestError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let records = reader
            .deserialize()
            .collect::<Result<Vec<IngestionRecord>, _>>()
            .map_err(|e| IngestError::Csv(e.to_string()))?;
        Ok(Self { records })
    }
}

const RECORD_HEADERS: [&str; 10] = [
    "date",
    "event",
    "bu",
    "property",
    "page",
    "supply",
    "allocation",
    "impressions",
    "rate",
    "price_type",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::MasterList;

    fn draft() -> RecordDraft {
        RecordDraft {
            date: NaiveDate::from_ymd_opt(2025, 6, 1),
            event: "launch".into(),
            bu: "Retail".into(),
            property: "mbs store".into(),
            page: "Home".into(),
            supply: Some(10),
            allocation: Some(5),
            impressions: Some(1000),
            rate: Some(2.5),
            price_type: Some(PriceType::Cpd),
        }
    }

    fn lists() -> MasterLists {
        MasterLists {
            properties: MasterList::from(vec!["MSB Store", "News"]),
            pages: MasterList::from(vec!["Home"]),
            business_units: MasterList::default(),
            events: MasterList::from(vec!["Launch"]),
        }
    }

    #[test]
    fn empty_draft_lists_every_field() {
        let errors = validate_draft(&RecordDraft::default());
        assert_eq!(errors.len(), 10);
        assert_eq!(errors[0], "Date is required");
        assert_eq!(errors[2], "Business Unit is required");
        assert_eq!(errors[9], "Price Type is required");
    }

    #[test]
    fn negative_rate_is_rejected() {
        let mut d = draft();
        d.rate = Some(-1.0);
        assert_eq!(validate_draft(&d), vec!["Rate must be a non-negative number"]);
    }

    #[test]
    fn add_maps_category_fields() {
        let mut log = IngestionLog::new();
        let mapper = Mapper::default();
        let record = log.add(&draft(), &mapper, &lists()).unwrap().clone();
        assert_eq!(record.property, "MSB Store");
        assert_eq!(record.event, "Launch");
        // empty master list keeps the typed value
        assert_eq!(record.bu, "Retail");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn add_rejects_incomplete_draft() {
        let mut log = IngestionLog::new();
        let mut d = draft();
        d.page = "  ".into();
        let err = log.add(&d, &Mapper::default(), &lists()).unwrap_err();
        assert!(err.to_string().contains("Page is required"));
        assert!(log.is_empty());
    }

    #[test]
    fn delete_many_ignores_bad_indices() {
        let mut log = IngestionLog::new();
        let mapper = Mapper::default();
        for event in ["a", "b", "c", "d"] {
            let mut d = draft();
            d.event = event.into();
            log.add(&d, &mapper, &MasterLists::default()).unwrap();
        }
        assert_eq!(log.delete(&[3, 1, 1, 9]), 2);
        let events: Vec<&str> = log.records().iter().map(|r| r.event.as_str()).collect();
        assert_eq!(events, vec!["a", "c"]);
    }

    #[test]
    fn summary_totals() {
        let mut log = IngestionLog::new();
        let mapper = Mapper::default();
        log.add(&draft(), &mapper, &lists()).unwrap();
        log.add(&draft(), &mapper, &lists()).unwrap();
        let s = log.summary();
        assert_eq!(s.total_records, 2);
        assert_eq!(s.total_supply, 20);
        assert_eq!(s.total_allocation, 10);
        assert_eq!(s.total_impressions, 2000);
    }

    #[test]
    fn csv_output_reads_back() {
        let mut log = IngestionLog::new();
        log.add(&draft(), &Mapper::default(), &lists()).unwrap();
        let text = log.to_csv().unwrap();
        assert!(text.starts_with(
            "date,event,bu,property,page,supply,allocation,impressions,rate,price_type\n"
        ));
        assert!(text.contains("2025-06-01,Launch,Retail,MSB Store,Home,10,5,1000,2.5,CPD"));
        let back = IngestionLog::from_csv(&text).unwrap();
        assert_eq!(back.records(), log.records());
    }

    #[test]
    fn empty_log_still_has_header() {
        assert_eq!(
            IngestionLog::new().to_csv().unwrap(),
            "date,event,bu,property,page,supply,allocation,impressions,rate,price_type\n"
        );
    }
}
