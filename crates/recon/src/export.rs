//! Change detection and export payloads.
//!
//! Each row type declares its policy through [`EditableView`]: what counts
//! as a change, which fields leave the system and under which headers.
//! Exports are pure functions of the view, so exporting twice yields
//! byte-identical payloads.

use ratebook_core::coerce::{finite_or_default, float_to_int};
use serde::Serialize;

use crate::error::ExportError;
use crate::model::{AllocationRow, CpmRateRow, ImpressionRow, RateRow, SupplyRow, ViewKind, ViewTable};

pub trait EditableView: Clone {
    /// Fixed export header.
    const HEADERS: &'static [&'static str];

    fn id(&self) -> &str;

    /// Whether the row belongs in the export.
    fn is_changed(&self) -> bool;

    /// Exported cells, in header order.
    fn export_fields(&self) -> Vec<String>;

    /// Re-establish invariants after an external edit.
    fn normalize(&mut self);

    /// Restore the editable fields under the view's policy.
    fn reset(&mut self);

    /// Set the primary editable value of the row.
    fn set_edit(&mut self, value: f64);

    /// Set the proposed rate of views that carry one next to their primary
    /// value. Returns false when the row has no such field.
    fn set_rate(&mut self, _value: f64) -> bool {
        false
    }

    /// Copy the editable fields of `submitted` into this row. Identity,
    /// original values and context are left as derived.
    fn take_edits(&mut self, submitted: &Self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPayload {
    pub view: ViewKind,
    pub file_name: String,
    pub content: String,
    /// Changed rows written, excluding the header.
    pub row_count: usize,
}

impl ExportPayload {
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

pub fn changed_rows<R: EditableView>(view: &ViewTable<R>) -> impl Iterator<Item = &R> {
    view.rows().iter().filter(|r| r.is_changed())
}

/// Serialize the changed rows of `view`. With no changes the payload holds
/// only the header.
pub fn export<R: EditableView>(view: &ViewTable<R>) -> Result<ExportPayload, ExportError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(R::HEADERS)?;

    let mut row_count = 0;
    for row in changed_rows(view) {
        writer.write_record(row.export_fields())?;
        row_count += 1;
    }

    let bytes = writer.into_inner().map_err(|e| ExportError::Csv(e.to_string()))?;
    let content = String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))?;

    tracing::debug!(view = %view.kind(), rows = row_count, "exported view");
    Ok(ExportPayload {
        view: view.kind(),
        file_name: view.kind().file_name().to_string(),
        content,
        row_count,
    })
}

/// Rows whose proposed rate differs from the original. Reported next to the
/// impression export, which itself only carries rows with impressions added.
pub fn rate_change_count(view: &ViewTable<ImpressionRow>) -> usize {
    view.rows().iter().filter(|r| r.new_rate != r.rate).count()
}

/// Render a float the way spreadsheet exports do: whole numbers keep one
/// decimal place.
pub fn format_float(value: f64) -> String {
    let value = finite_or_default(value);
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

impl EditableView for RateRow {
    const HEADERS: &'static [&'static str] = &["id", "rate"];

    fn id(&self) -> &str {
        &self.id
    }

    fn is_changed(&self) -> bool {
        self.new_rate != self.original_rate
    }

    fn export_fields(&self) -> Vec<String> {
        vec![self.id.clone(), self.new_rate.to_string()]
    }

    fn normalize(&mut self) {}

    fn reset(&mut self) {
        self.new_rate = self.original_rate;
    }

    fn set_edit(&mut self, value: f64) {
        self.new_rate = float_to_int(value);
    }

    fn take_edits(&mut self, submitted: &Self) {
        self.new_rate = submitted.new_rate;
    }
}

impl EditableView for SupplyRow {
    const HEADERS: &'static [&'static str] = &["id", "inventory"];

    fn id(&self) -> &str {
        &self.id
    }

    fn is_changed(&self) -> bool {
        self.new_inventory > 0
    }

    fn export_fields(&self) -> Vec<String> {
        vec![self.id.clone(), self.inventory.saturating_add(self.new_inventory).to_string()]
    }

    fn normalize(&mut self) {
        self.total_inventory = self.inventory.saturating_add(self.new_inventory);
    }

    fn reset(&mut self) {
        self.new_inventory = 0;
        self.normalize();
    }

    fn set_edit(&mut self, value: f64) {
        self.new_inventory = float_to_int(value);
        self.normalize();
    }

    fn take_edits(&mut self, submitted: &Self) {
        self.new_inventory = submitted.new_inventory;
    }
}

impl EditableView for AllocationRow {
    const HEADERS: &'static [&'static str] = &["id", "impressions"];

    fn id(&self) -> &str {
        &self.id
    }

    fn is_changed(&self) -> bool {
        self.new_impressions > 0
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.impressions.saturating_add(self.new_impressions).to_string(),
        ]
    }

    fn normalize(&mut self) {
        self.total_impressions = self.impressions.saturating_add(self.new_impressions);
    }

    fn reset(&mut self) {
        self.new_impressions = 0;
        self.normalize();
    }

    fn set_edit(&mut self, value: f64) {
        self.new_impressions = float_to_int(value);
        self.normalize();
    }

    fn take_edits(&mut self, submitted: &Self) {
        self.new_impressions = submitted.new_impressions;
    }
}

impl EditableView for ImpressionRow {
    const HEADERS: &'static [&'static str] = &["id", "cpd_impressions", "rate"];

    fn id(&self) -> &str {
        &self.id
    }

    fn is_changed(&self) -> bool {
        self.cpd_impressions > 0
    }

    fn export_fields(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.cpd_impressions.to_string(),
            self.new_rate.to_string(),
        ]
    }

    fn normalize(&mut self) {}

    fn reset(&mut self) {
        self.cpd_impressions = 0;
        self.new_rate = self.rate;
    }

    fn set_edit(&mut self, value: f64) {
        self.cpd_impressions = float_to_int(value);
    }

    fn set_rate(&mut self, value: f64) -> bool {
        self.new_rate = float_to_int(value);
        true
    }

    fn take_edits(&mut self, submitted: &Self) {
        self.cpd_impressions = submitted.cpd_impressions;
        self.new_rate = submitted.new_rate;
    }
}

impl EditableView for CpmRateRow {
    const HEADERS: &'static [&'static str] = &["id", "rate"];

    fn id(&self) -> &str {
        &self.id
    }

    fn is_changed(&self) -> bool {
        self.new_rate > 0.0
    }

    fn export_fields(&self) -> Vec<String> {
        vec![self.id.clone(), format_float(self.new_rate)]
    }

    fn normalize(&mut self) {
        self.new_rate = finite_or_default(self.new_rate);
    }

    fn reset(&mut self) {
        self.new_rate = 0.0;
    }

    fn set_edit(&mut self, value: f64) {
        self.new_rate = finite_or_default(value);
    }

    fn take_edits(&mut self, submitted: &Self) {
        self.new_rate = submitted.new_rate;
    }
}
