use ratebook_core::{coerce_float, RawTable};

use crate::error::ViewError;
use crate::model::{CpmRateRow, ViewKind, ViewTable};
use crate::schema::{self, ContextField};
use crate::views::{project, require};

const CONTEXT: [ContextField; 2] = [ContextField::Date, ContextField::Property];

/// Derive the CPM rate view. New rates start blank (zero).
pub fn build(raw: &RawTable) -> Result<ViewTable<CpmRateRow>, ViewError> {
    let kind = ViewKind::CpmRate;
    let id = require(raw, &schema::supply_id(), kind)?;
    let rate = require(raw, &schema::supply_rate(), kind)?;

    let rows: Vec<CpmRateRow> = project(raw, &[id, rate], &CONTEXT)
        .into_iter()
        .map(|p| CpmRateRow {
            id: p.values[0].clone(),
            original_rate: coerce_float(&p.values[1]),
            new_rate: 0.0,
            context: p.context,
        })
        .collect();

    tracing::debug!(rows = rows.len(), "prepared CPM rate view");
    Ok(ViewTable::new(kind, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::{apply, EditAction};

    #[test]
    fn new_rates_start_at_zero() {
        let raw = RawTable::from_rows(
            &["supply__id", "supply__dimension_dict__rate", "supply__date"],
            &[&["s1", "2.5", "2025-03-01"], &["s2", "inf", "2025-03-01"]],
        );
        let view = build(&raw).unwrap();
        assert_eq!(view.rows()[0].original_rate, 2.5);
        assert_eq!(view.rows()[1].original_rate, 0.0);
        assert!(view.rows().iter().all(|r| r.new_rate == 0.0));
        assert_eq!(view.rows()[0].context.date.as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn submitted_non_finite_rates_are_normalized() {
        let raw = RawTable::from_rows(&["supply__id", "supply__dimension_dict__rate"], &[&["s1", "1"], &["s2", "1"]]);
        let view = build(&raw).unwrap();
        let mut rows = view.rows().to_vec();
        rows[0].new_rate = f64::NAN;
        rows[1].new_rate = f64::NEG_INFINITY;
        let next = apply(&view, EditAction::Submit(rows)).unwrap();
        assert!(next.rows().iter().all(|r| r.new_rate == 0.0));
    }
}
