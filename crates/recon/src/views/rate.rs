use ratebook_core::{coerce_int, RawTable};

use crate::error::ViewError;
use crate::model::{RateRow, ViewKind, ViewTable};
use crate::schema::{self, ContextField};
use crate::views::{project, require};

const CONTEXT: [ContextField; 3] = [ContextField::SupplyBu, ContextField::Property, ContextField::Date];

/// Derive the CPD rate view. Each row's new rate starts at its original.
pub fn build(raw: &RawTable) -> Result<ViewTable<RateRow>, ViewError> {
    let kind = ViewKind::CpdRate;
    let id = require(raw, &schema::supply_id(), kind)?;
    let rate = require(raw, &schema::supply_rate(), kind)?;

    let rows: Vec<RateRow> = project(raw, &[id, rate], &CONTEXT)
        .into_iter()
        .map(|p| {
            let original_rate = coerce_int(&p.values[1]);
            RateRow {
                id: p.values[0].clone(),
                original_rate,
                new_rate: original_rate,
                context: p.context,
            }
        })
        .collect();

    tracing::debug!(rows = rows.len(), "prepared rate view");
    Ok(ViewTable::new(kind, rows))
}
