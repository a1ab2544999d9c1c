use ratebook_core::{coerce_int, ColumnSpec, RawTable};
use serde::Serialize;

use crate::error::ViewError;
use crate::model::{ImpressionRow, ViewKind, ViewTable};
use crate::schema::{self, ContextField};
use crate::views::{project, require};

const CONTEXT: [ContextField; 3] = [ContextField::SupplyBu, ContextField::Property, ContextField::Date];

/// Editable field of the impression view, for the single-field resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpressionField {
    Impressions,
    Rate,
}

/// Derive the CPD impression view: proposed rate carried forward, impressions
/// to add starting at zero, and the current CPD impressions when reported.
pub fn build(raw: &RawTable) -> Result<ViewTable<ImpressionRow>, ViewError> {
    let kind = ViewKind::CpdImpression;
    let id = require(raw, &schema::supply_id(), kind)?;
    let rate = require(raw, &schema::supply_rate(), kind)?;
    let current = ColumnSpec::optional(schema::SUPPLY_CPD_IMPRESSIONS)
        .resolve(raw)
        .column()
        .and_then(|c| raw.column_index(c));

    let mut values = vec![id, rate];
    values.extend(current);

    let rows: Vec<ImpressionRow> = project(raw, &values, &CONTEXT)
        .into_iter()
        .map(|p| {
            let rate = coerce_int(&p.values[1]);
            ImpressionRow {
                id: p.values[0].clone(),
                rate,
                new_rate: rate,
                cpd_impressions: 0,
                current_cpd_impressions: p.values.get(2).map(|v| coerce_int(v)),
                context: p.context,
            }
        })
        .collect();

    tracing::debug!(rows = rows.len(), "prepared impression view");
    Ok(ViewTable::new(kind, rows))
}

/// Reset one editable field, leaving the other as it is.
pub fn reset_field(view: &ViewTable<ImpressionRow>, field: ImpressionField) -> ViewTable<ImpressionRow> {
    let rows = view
        .rows()
        .iter()
        .cloned()
        .map(|mut row| {
            match field {
                ImpressionField::Impressions => row.cpd_impressions = 0,
                ImpressionField::Rate => row.new_rate = row.rate,
            }
            row
        })
        .collect();
    ViewTable::new(view.kind(), rows)
}
