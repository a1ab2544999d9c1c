//! Per-user session state.
//!
//! The session owns every prepared view and is the only place state is
//! committed. A command either replaces a whole view or fails and leaves
//! the session as it was. Build failures never escape `load_report`: the
//! affected view degrades to empty and a notice is recorded.

use ratebook_core::{Notice, Notices, RawTable};
use ratebook_mapping::{
    validate_records, Category, IngestError, IngestionLog, IngestionRecord, Mapper, MasterLists, MatchResult,
    RecordDraft, Similarity, TokenSortRatio, ValidationReport,
};
use serde::Serialize;

use crate::error::{SessionError, ViewError};
use crate::export::{self, EditableView, ExportPayload};
use crate::model::{
    AllocationRow, CpmRateRow, ImpressionRow, PricingModel, RateRow, SupplyRow, ViewKind, ViewTable,
};
use crate::report::{self, ReportOptions, ReportSummary};
use crate::views::impression::{self, ImpressionField};
use crate::views::{self, cpm_rate, rate, slot, EditAction, RowEdit};

/// Independently clearable parts of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Cpd,
    Cpm,
    /// Accepted ingestion records.
    Ingestion,
    /// Loaded master lists.
    Mapping,
}

#[derive(Debug, Clone, Default)]
pub struct CpdState {
    pub raw: Option<RawTable>,
    pub rate: Option<ViewTable<RateRow>>,
    pub supply: Option<ViewTable<SupplyRow>>,
    pub allocation: Option<ViewTable<AllocationRow>>,
    pub impression: Option<ViewTable<ImpressionRow>>,
}

#[derive(Debug, Clone, Default)]
pub struct CpmState {
    pub raw: Option<RawTable>,
    pub supply: Option<ViewTable<SupplyRow>>,
    pub allocation: Option<ViewTable<AllocationRow>>,
    pub rate: Option<ViewTable<CpmRateRow>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Rate(EditAction<RateRow>),
    Supply(PricingModel, EditAction<SupplyRow>),
    Allocation(PricingModel, EditAction<AllocationRow>),
    Impression(EditAction<ImpressionRow>),
    /// Reset one field of the impression view, keeping the other.
    ResetImpressionField(ImpressionField),
    CpmRate(EditAction<CpmRateRow>),
    /// Derive the view again from the stored report partition.
    Rebuild(ViewKind),
    Clear(Namespace),
}

pub struct Session<S = TokenSortRatio> {
    options: ReportOptions,
    mapper: Mapper<S>,
    summary: Option<ReportSummary>,
    cpd: CpdState,
    cpm: CpmState,
    records: IngestionLog,
    masters: MasterLists,
    notices: Notices,
}

impl Session<TokenSortRatio> {
    pub fn new(options: ReportOptions) -> Self {
        Self::with_mapper(options, Mapper::default())
    }
}

impl Default for Session<TokenSortRatio> {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

impl<S: Similarity> Session<S> {
    pub fn with_mapper(options: ReportOptions, mapper: Mapper<S>) -> Self {
        Self {
            options,
            mapper,
            summary: None,
            cpd: CpdState::default(),
            cpm: CpmState::default(),
            records: IngestionLog::new(),
            masters: MasterLists::default(),
            notices: Notices::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Report views
    // -----------------------------------------------------------------------

    /// Replace all CPD and CPM state with views derived from `raw`. Notices
    /// raised by a previous report are dropped with it.
    pub fn load_report(&mut self, raw: &RawTable) -> ReportSummary {
        self.notices = Notices::new();
        let (partitions, summary) = report::prepare(raw, &self.options, &mut self.notices);

        self.cpd = match partitions.cpd {
            Some(raw) => self.prepare_cpd(raw),
            None => CpdState::default(),
        };
        self.cpm = match partitions.cpm {
            Some(raw) => self.prepare_cpm(raw),
            None => CpmState::default(),
        };
        self.summary = Some(summary);
        summary
    }

    fn prepare_cpd(&mut self, raw: RawTable) -> CpdState {
        CpdState {
            rate: Some(self.settle(ViewKind::CpdRate, rate::build(&raw))),
            supply: Some(self.settle(ViewKind::CpdSupply, slot::build_supply(&raw, PricingModel::Cpd))),
            allocation: Some(self.settle(
                ViewKind::CpdAllocation,
                slot::build_allocation(&raw, PricingModel::Cpd),
            )),
            impression: Some(self.settle(ViewKind::CpdImpression, impression::build(&raw))),
            raw: Some(raw),
        }
    }

    fn prepare_cpm(&mut self, raw: RawTable) -> CpmState {
        CpmState {
            supply: Some(self.settle(ViewKind::CpmSupply, slot::build_supply(&raw, PricingModel::Cpm))),
            allocation: Some(self.settle(
                ViewKind::CpmAllocation,
                slot::build_allocation(&raw, PricingModel::Cpm),
            )),
            rate: Some(self.settle(ViewKind::CpmRate, cpm_rate::build(&raw))),
            raw: Some(raw),
        }
    }

    /// Turn a build failure into an empty view plus an error notice.
    fn settle<R>(&mut self, kind: ViewKind, built: Result<ViewTable<R>, ViewError>) -> ViewTable<R> {
        match built {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(view = %kind, error = %e, "view build failed");
                self.notices.error(e.to_string());
                ViewTable::empty(kind)
            }
        }
    }

    /// Commit one command.
    pub fn apply(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Rate(action) => commit(&mut self.cpd.rate, ViewKind::CpdRate, action),
            Command::Supply(pricing, action) => {
                let (target, kind) = match pricing {
                    PricingModel::Cpd => (&mut self.cpd.supply, ViewKind::CpdSupply),
                    PricingModel::Cpm => (&mut self.cpm.supply, ViewKind::CpmSupply),
                };
                commit(target, kind, action)
            }
            Command::Allocation(pricing, action) => {
                let (target, kind) = match pricing {
                    PricingModel::Cpd => (&mut self.cpd.allocation, ViewKind::CpdAllocation),
                    PricingModel::Cpm => (&mut self.cpm.allocation, ViewKind::CpmAllocation),
                };
                commit(target, kind, action)
            }
            Command::Impression(action) => commit(&mut self.cpd.impression, ViewKind::CpdImpression, action),
            Command::ResetImpressionField(field) => {
                let view = self
                    .cpd
                    .impression
                    .as_ref()
                    .ok_or(SessionError::ViewNotPrepared(ViewKind::CpdImpression))?;
                let next = impression::reset_field(view, field);
                tracing::info!(?field, "impression field reset");
                self.cpd.impression = Some(next);
                Ok(())
            }
            Command::CpmRate(action) => commit(&mut self.cpm.rate, ViewKind::CpmRate, action),
            Command::Rebuild(kind) => self.rebuild(kind),
            Command::Clear(namespace) => {
                self.clear(namespace);
                Ok(())
            }
        }
    }

    fn rebuild(&mut self, kind: ViewKind) -> Result<(), SessionError> {
        let raw = match kind.pricing() {
            PricingModel::Cpd => self.cpd.raw.clone(),
            PricingModel::Cpm => self.cpm.raw.clone(),
        }
        .ok_or(SessionError::NoReport(kind))?;

        match kind {
            ViewKind::CpdRate => self.cpd.rate = Some(self.settle(kind, rate::build(&raw))),
            ViewKind::CpdSupply => {
                self.cpd.supply = Some(self.settle(kind, slot::build_supply(&raw, PricingModel::Cpd)))
            }
            ViewKind::CpdAllocation => {
                self.cpd.allocation = Some(self.settle(kind, slot::build_allocation(&raw, PricingModel::Cpd)))
            }
            ViewKind::CpdImpression => self.cpd.impression = Some(self.settle(kind, impression::build(&raw))),
            ViewKind::CpmSupply => {
                self.cpm.supply = Some(self.settle(kind, slot::build_supply(&raw, PricingModel::Cpm)))
            }
            ViewKind::CpmAllocation => {
                self.cpm.allocation = Some(self.settle(kind, slot::build_allocation(&raw, PricingModel::Cpm)))
            }
            ViewKind::CpmRate => self.cpm.rate = Some(self.settle(kind, cpm_rate::build(&raw))),
        }
        tracing::info!(view = %kind, "view rebuilt from report");
        Ok(())
    }

    pub fn clear(&mut self, namespace: Namespace) {
        match namespace {
            Namespace::Cpd => self.cpd = CpdState::default(),
            Namespace::Cpm => self.cpm = CpmState::default(),
            Namespace::Ingestion => self.records.clear(),
            Namespace::Mapping => self.masters = MasterLists::default(),
        }
        if matches!(namespace, Namespace::Cpd | Namespace::Cpm) && self.cpd.raw.is_none() && self.cpm.raw.is_none() {
            self.summary = None;
        }
        tracing::info!(?namespace, "session namespace cleared");
    }

    pub fn cpd(&self) -> &CpdState {
        &self.cpd
    }

    pub fn cpm(&self) -> &CpmState {
        &self.cpm
    }

    pub fn summary(&self) -> Option<ReportSummary> {
        self.summary
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Drain the notices collected so far.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    pub fn is_prepared(&self, kind: ViewKind) -> bool {
        match kind {
            ViewKind::CpdRate => self.cpd.rate.is_some(),
            ViewKind::CpdSupply => self.cpd.supply.is_some(),
            ViewKind::CpdAllocation => self.cpd.allocation.is_some(),
            ViewKind::CpdImpression => self.cpd.impression.is_some(),
            ViewKind::CpmSupply => self.cpm.supply.is_some(),
            ViewKind::CpmAllocation => self.cpm.allocation.is_some(),
            ViewKind::CpmRate => self.cpm.rate.is_some(),
        }
    }

    /// Change-only export of a prepared view.
    pub fn export(&self, kind: ViewKind) -> Result<ExportPayload, SessionError> {
        let payload = match kind {
            ViewKind::CpdRate => export::export(prepared(&self.cpd.rate, kind)?)?,
            ViewKind::CpdSupply => export::export(prepared(&self.cpd.supply, kind)?)?,
            ViewKind::CpdAllocation => export::export(prepared(&self.cpd.allocation, kind)?)?,
            ViewKind::CpdImpression => export::export(prepared(&self.cpd.impression, kind)?)?,
            ViewKind::CpmSupply => export::export(prepared(&self.cpm.supply, kind)?)?,
            ViewKind::CpmAllocation => export::export(prepared(&self.cpm.allocation, kind)?)?,
            ViewKind::CpmRate => export::export(prepared(&self.cpm.rate, kind)?)?,
        };
        Ok(payload)
    }

    /// Rows of the impression view whose rate was changed.
    pub fn impression_rate_changes(&self) -> Option<usize> {
        self.cpd.impression.as_ref().map(export::rate_change_count)
    }

    /// JSON rendering of a prepared view's rows.
    pub fn render(&self, kind: ViewKind) -> Result<serde_json::Value, SessionError> {
        let value = match kind {
            ViewKind::CpdRate => serde_json::to_value(prepared(&self.cpd.rate, kind)?),
            ViewKind::CpdSupply => serde_json::to_value(prepared(&self.cpd.supply, kind)?),
            ViewKind::CpdAllocation => serde_json::to_value(prepared(&self.cpd.allocation, kind)?),
            ViewKind::CpdImpression => serde_json::to_value(prepared(&self.cpd.impression, kind)?),
            ViewKind::CpmSupply => serde_json::to_value(prepared(&self.cpm.supply, kind)?),
            ViewKind::CpmAllocation => serde_json::to_value(prepared(&self.cpm.allocation, kind)?),
            ViewKind::CpmRate => serde_json::to_value(prepared(&self.cpm.rate, kind)?),
        };
        value.map_err(|e| SessionError::Render(e.to_string()))
    }

    /// Apply `edits` to the listed ids of a prepared view and commit the
    /// result. Returns the ids that matched no row.
    pub fn apply_edits(&mut self, kind: ViewKind, edits: &[RowEdit]) -> Result<Vec<String>, SessionError> {
        fn edited<R: EditableView>(
            view: &Option<ViewTable<R>>,
            kind: ViewKind,
            edits: &[RowEdit],
        ) -> Result<(EditAction<R>, Vec<String>), SessionError> {
            let (rows, unknown) = views::with_edits(prepared(view, kind)?, edits);
            Ok((EditAction::Submit(rows), unknown))
        }

        let (command, unknown) = match kind {
            ViewKind::CpdRate => {
                let (a, u) = edited(&self.cpd.rate, kind, edits)?;
                (Command::Rate(a), u)
            }
            ViewKind::CpdSupply => {
                let (a, u) = edited(&self.cpd.supply, kind, edits)?;
                (Command::Supply(PricingModel::Cpd, a), u)
            }
            ViewKind::CpdAllocation => {
                let (a, u) = edited(&self.cpd.allocation, kind, edits)?;
                (Command::Allocation(PricingModel::Cpd, a), u)
            }
            ViewKind::CpdImpression => {
                let (a, u) = edited(&self.cpd.impression, kind, edits)?;
                (Command::Impression(a), u)
            }
            ViewKind::CpmSupply => {
                let (a, u) = edited(&self.cpm.supply, kind, edits)?;
                (Command::Supply(PricingModel::Cpm, a), u)
            }
            ViewKind::CpmAllocation => {
                let (a, u) = edited(&self.cpm.allocation, kind, edits)?;
                (Command::Allocation(PricingModel::Cpm, a), u)
            }
            ViewKind::CpmRate => {
                let (a, u) = edited(&self.cpm.rate, kind, edits)?;
                (Command::CpmRate(a), u)
            }
        };
        self.apply(command)?;
        Ok(unknown)
    }

    // -----------------------------------------------------------------------
    // Ingestion and mapping
    // -----------------------------------------------------------------------

    pub fn mapper(&self) -> &Mapper<S> {
        &self.mapper
    }

    pub fn master_lists(&self) -> &MasterLists {
        &self.masters
    }

    pub fn set_master_lists(&mut self, lists: MasterLists) {
        let counts = lists.counts();
        tracing::info!(?counts, "master lists loaded");
        self.masters = lists;
    }

    pub fn records(&self) -> &IngestionLog {
        &self.records
    }

    pub fn add_record(&mut self, draft: &RecordDraft) -> Result<&IngestionRecord, IngestError> {
        self.records.add(draft, &self.mapper, &self.masters)
    }

    pub fn delete_records(&mut self, indices: &[usize]) -> usize {
        let removed = self.records.delete(indices);
        if removed > 0 {
            tracing::info!(removed, "records deleted");
        }
        removed
    }

    pub fn validate_records(&self) -> ValidationReport {
        validate_records(self.records.records(), &self.masters, &self.mapper)
    }

    /// Match a typed value against the loaded list for `category`.
    pub fn suggest(&self, category: Category, value: &str) -> MatchResult {
        self.mapper.validate_and_suggest(value, self.masters.get(category))
    }
}

fn prepared<R>(view: &Option<ViewTable<R>>, kind: ViewKind) -> Result<&ViewTable<R>, SessionError> {
    view.as_ref().ok_or(SessionError::ViewNotPrepared(kind))
}

fn commit<R: EditableView>(
    target: &mut Option<ViewTable<R>>,
    kind: ViewKind,
    action: EditAction<R>,
) -> Result<(), SessionError> {
    let current = prepared(target, kind)?;
    let next = views::apply(current, action).map_err(|e| {
        tracing::warn!(view = %kind, error = %e, "submission rejected");
        e
    })?;
    tracing::info!(view = %kind, rows = next.len(), "view committed");
    *target = Some(next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebook_core::Severity;
    use ratebook_mapping::{MasterList, PriceType};

    fn report() -> RawTable {
        RawTable::from_rows(
            &[
                "supply__id",
                "supply__dimension_dict__revenue_type",
                "supply__dimension_dict__rate",
                "supply__metrics_data__inventory",
                "allocation_id",
                "metrics_data__impressions",
            ],
            &[
                &["s1", "CPD", "10", "100", "a1", "40"],
                &["s1", "CPD", "10", "100", "a1", "40"],
                &["s2", "CPM", "2.5", "80", "a2", "20"],
            ],
        )
    }

    fn loaded() -> Session {
        let mut session = Session::default();
        session.load_report(&report());
        session
    }

    #[test]
    fn load_prepares_both_partitions() {
        let session = loaded();
        assert_eq!(session.summary().unwrap().cpd_records, 2);
        let rate = session.cpd().rate.as_ref().unwrap();
        assert_eq!(rate.len(), 1);
        assert_eq!(rate.rows()[0].new_rate, 10);
        assert_eq!(session.cpm().supply.as_ref().unwrap().rows()[0].id, "s2");
        assert!(session.notices().is_empty());
    }

    #[test]
    fn failing_view_degrades_without_affecting_siblings() {
        let raw = RawTable::from_rows(
            &["supply__id", "supply__dimension_dict__revenue_type", "supply__dimension_dict__rate"],
            &[&["s1", "cpd", "10"]],
        );
        let mut session = Session::default();
        session.load_report(&raw);

        assert!(session.cpd().supply.as_ref().unwrap().is_empty());
        assert_eq!(session.cpd().rate.as_ref().unwrap().len(), 1);
        let errors = session.notices().messages_at_least(Severity::Error);
        assert!(errors.contains(&"cpd-supply: supply__metrics_data__inventory column not found"));
        assert!(errors.iter().any(|m| m.starts_with("cpd-allocation")));
    }

    #[test]
    fn edits_commit_and_export() {
        let mut session = loaded();
        let unknown = session.apply_edits(ViewKind::CpdSupply, &[RowEdit::value("s1", 5.0)]).unwrap();
        assert!(unknown.is_empty());
        assert_eq!(session.cpd().supply.as_ref().unwrap().rows()[0].total_inventory, 105);

        let payload = session.export(ViewKind::CpdSupply).unwrap();
        assert_eq!(payload.content, "id,inventory\ns1,105\n");
        assert_eq!(session.export(ViewKind::CpdSupply).unwrap(), payload);
    }

    #[test]
    fn reload_drops_notices_from_the_previous_report() {
        let broken = RawTable::from_rows(
            &["supply__id", "supply__dimension_dict__revenue_type"],
            &[&["s1", "CPD"], &["s2", "CPM"]],
        );
        let mut session = Session::default();
        session.load_report(&broken);
        assert!(!session.notices().messages_at_least(Severity::Error).is_empty());

        session.load_report(&report());
        assert!(session.notices().is_empty());
        assert_eq!(session.cpd().rate.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn rejected_submission_keeps_committed_view() {
        let mut session = loaded();
        session.apply_edits(ViewKind::CpdRate, &[RowEdit::value("s1", 12.0)]).unwrap();
        let before = session.cpd().rate.clone();

        let mut forged = before.as_ref().unwrap().rows().to_vec();
        forged[0].id = "forged".into();
        forged[0].new_rate = 99;
        let err = session.apply(Command::Rate(EditAction::Submit(forged))).unwrap_err();
        assert!(matches!(err, SessionError::Rejected(ViewError::SubmissionMismatch { .. })));
        assert_eq!(session.cpd().rate, before);
        assert_eq!(session.export(ViewKind::CpdRate).unwrap().content, "id,rate\ns1,12\n");
    }

    #[test]
    fn impression_edits_carry_rate_and_impressions() {
        let mut session = loaded();
        session
            .apply_edits(ViewKind::CpdImpression, &[RowEdit::value("s1", 25.0).with_rate(14.0)])
            .unwrap();
        let payload = session.export(ViewKind::CpdImpression).unwrap();
        assert_eq!(payload.content, "id,cpd_impressions,rate\ns1,25,14\n");
        assert_eq!(session.impression_rate_changes(), Some(1));
    }

    #[test]
    fn commands_on_missing_views_leave_state_alone() {
        let mut session = Session::default();
        let err = session.apply(Command::Rate(EditAction::Reset)).unwrap_err();
        assert!(matches!(err, SessionError::ViewNotPrepared(ViewKind::CpdRate)));
        assert!(matches!(session.apply(Command::Rebuild(ViewKind::CpmRate)), Err(SessionError::NoReport(_))));
        assert!(session.export(ViewKind::CpmRate).is_err());
    }

    #[test]
    fn rebuild_discards_edits() {
        let mut session = loaded();
        session.apply_edits(ViewKind::CpdImpression, &[RowEdit::value("s1", 30.0)]).unwrap();
        session.apply(Command::ResetImpressionField(ImpressionField::Rate)).unwrap();
        assert_eq!(session.cpd().impression.as_ref().unwrap().rows()[0].cpd_impressions, 30);

        session.apply(Command::Rebuild(ViewKind::CpdImpression)).unwrap();
        assert_eq!(session.cpd().impression.as_ref().unwrap().rows()[0].cpd_impressions, 0);
    }

    #[test]
    fn clear_removes_only_its_namespace() {
        let mut session = loaded();
        session.clear(Namespace::Cpd);
        assert!(!session.is_prepared(ViewKind::CpdRate));
        assert!(session.is_prepared(ViewKind::CpmRate));
        assert!(session.summary().is_some());

        session.apply(Command::Clear(Namespace::Cpm)).unwrap();
        assert!(session.summary().is_none());
    }

    #[test]
    fn render_flattens_context() {
        let session = loaded();
        let json = session.render(ViewKind::CpmRate).unwrap();
        assert_eq!(json["kind"], "cpm-rate");
        assert_eq!(json["rows"][0]["original_rate"], 2.5);
    }

    #[test]
    fn ingestion_maps_against_loaded_lists() {
        let mut session = Session::default();
        let mut lists = MasterLists::default();
        lists.set(Category::Property, MasterList::from(vec!["MSB Store"]));
        session.set_master_lists(lists);

        let draft = RecordDraft {
            date: chrono_date(),
            event: "Launch".into(),
            bu: "Retail".into(),
            property: "Mbs Store".into(),
            page: "Home".into(),
            supply: Some(1),
            allocation: Some(1),
            impressions: Some(10),
            rate: Some(2.0),
            price_type: Some(PriceType::Cpm),
        };
        assert_eq!(session.add_record(&draft).unwrap().property, "MSB Store");
        assert!(session.validate_records().is_clean());
        assert!(!session.suggest(Category::Property, "Nope").is_valid);

        session.clear(Namespace::Mapping);
        assert!(!session.master_lists().is_loaded());
        assert_eq!(session.records().len(), 1);
        assert_eq!(session.delete_records(&[0, 4]), 1);
    }

    fn chrono_date() -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::from_ymd_opt(2025, 5, 1)
    }
}
