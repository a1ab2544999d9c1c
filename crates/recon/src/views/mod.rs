//! View builders and the pure actions that edit them.
//!
//! Every builder follows the same shape: resolve the required columns,
//! project them together with whichever context columns exist, drop
//! duplicate tuples (first seen wins), skip rows without an identity, then
//! attach the editable fields under the view's policy. Actions never mutate
//! their input; they return the next version of the table.

pub mod cpm_rate;
pub mod impression;
pub mod rate;
pub mod slot;

use ratebook_core::{ColumnSpec, RawTable};

use crate::error::ViewError;
use crate::export::EditableView;
use crate::model::{RowContext, ViewKind, ViewTable};
use crate::schema::ContextField;

/// Whole-table edit applied to any view.
#[derive(Debug, Clone, PartialEq)]
pub enum EditAction<R> {
    /// Replace the editable fields of every row with those of the submitted
    /// table, which must list the view's rows in order.
    Submit(Vec<R>),
    /// Restore the editable fields under the view's policy.
    Reset,
}

/// Requested change to every row carrying `id`. Absent fields are left as
/// they are.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEdit {
    pub id: String,
    /// Primary editable value of the view.
    pub value: Option<f64>,
    /// Proposed rate, for views that edit one next to their primary value.
    pub rate: Option<f64>,
}

impl RowEdit {
    pub fn value(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value: Some(value),
            rate: None,
        }
    }

    pub fn rate(id: impl Into<String>, rate: f64) -> Self {
        Self {
            id: id.into(),
            value: None,
            rate: Some(rate),
        }
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }
}

/// Produce the next version of `view`.
///
/// A submission only contributes editable fields: identities, original
/// values and context always come from `view`. It is rejected when its rows
/// do not match the view's ids in order, and `view` is left as it was.
pub fn apply<R: EditableView>(view: &ViewTable<R>, action: EditAction<R>) -> Result<ViewTable<R>, ViewError> {
    let mut rows = view.rows().to_vec();
    match action {
        EditAction::Submit(submitted) => {
            if submitted.len() != rows.len() {
                return Err(ViewError::SubmissionMismatch {
                    view: view.kind(),
                    message: format!("expected {} rows, got {}", rows.len(), submitted.len()),
                });
            }
            if let Some(pos) = rows.iter().zip(&submitted).position(|(row, s)| row.id() != s.id()) {
                return Err(ViewError::SubmissionMismatch {
                    view: view.kind(),
                    message: format!(
                        "row {} has id '{}', expected '{}'",
                        pos,
                        submitted[pos].id(),
                        rows[pos].id()
                    ),
                });
            }
            for (row, s) in rows.iter_mut().zip(&submitted) {
                row.take_edits(s);
                row.normalize();
            }
        }
        EditAction::Reset => rows.iter_mut().for_each(|r| r.reset()),
    }
    Ok(ViewTable::new(view.kind(), rows))
}

/// Rows to submit after applying `edits` to every row whose id they name.
/// Ids matching no row are returned alongside.
pub fn with_edits<R: EditableView>(view: &ViewTable<R>, edits: &[RowEdit]) -> (Vec<R>, Vec<String>) {
    let mut rows = view.rows().to_vec();
    let mut unknown = Vec::new();
    let mut ignored_rates = 0;

    for edit in edits {
        let mut hit = false;
        for row in rows.iter_mut().filter(|r| r.id() == edit.id) {
            if let Some(value) = edit.value {
                row.set_edit(value);
            }
            if let Some(rate) = edit.rate {
                if !row.set_rate(rate) {
                    ignored_rates += 1;
                }
            }
            hit = true;
        }
        if !hit {
            unknown.push(edit.id.clone());
        }
    }

    if ignored_rates > 0 {
        tracing::warn!(view = %view.kind(), rows = ignored_rates, "view has no rate to edit; rate edits ignored");
    }
    if !unknown.is_empty() {
        tracing::warn!(view = %view.kind(), count = unknown.len(), "edits reference unknown ids");
    }
    (rows, unknown)
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// One distinct projected row: required values in request order, then context.
pub(crate) struct Projected {
    pub values: Vec<String>,
    pub context: RowContext,
}

pub(crate) fn require(raw: &RawTable, spec: &ColumnSpec, view: ViewKind) -> Result<usize, ViewError> {
    spec.resolve(raw)
        .column()
        .and_then(|c| raw.column_index(c))
        .ok_or_else(|| ViewError::MissingColumn {
            view,
            message: spec.missing_message().to_string(),
        })
}

/// Project `values` (identity first) plus the context columns present in
/// the schema, deduplicated on the full tuple.
pub(crate) fn project(raw: &RawTable, values: &[usize], context: &[ContextField]) -> Vec<Projected> {
    let present: Vec<(ContextField, usize)> = context
        .iter()
        .filter_map(|&field| {
            field
                .spec()
                .resolve(raw)
                .column()
                .and_then(|c| raw.column_index(c))
                .map(|idx| (field, idx))
        })
        .collect();

    let mut indices = values.to_vec();
    indices.extend(present.iter().map(|(_, idx)| *idx));

    let distinct = raw.distinct_projection(&indices);
    let total = distinct.len();

    let projected: Vec<Projected> = distinct
        .into_iter()
        .filter(|tuple| !tuple[0].trim().is_empty())
        .map(|mut tuple| {
            let tail = tuple.split_off(values.len());
            let mut ctx = RowContext::default();
            for ((field, _), cell) in present.iter().zip(tail) {
                let slot = match field {
                    ContextField::SupplyBu => &mut ctx.bu,
                    ContextField::AllocationBu => &mut ctx.allocation_bu,
                    ContextField::Property => &mut ctx.property,
                    ContextField::Date => &mut ctx.date,
                };
                *slot = Some(cell);
            }
            Projected {
                values: tuple,
                context: ctx,
            }
        })
        .collect();

    let skipped = total - projected.len();
    if skipped > 0 {
        tracing::debug!(skipped, "skipped rows without an identity");
    }
    projected
}
