//! `ratebook-recon`: editable views over report data.
//!
//! Pure crate: receives an already-fetched report table, derives the
//! editable rate, slot and impression views, and returns change-only
//! export payloads. No CLI or IO dependencies.

pub mod error;
pub mod export;
pub mod model;
pub mod report;
pub mod schema;
pub mod session;
pub mod views;

pub use error::{ExportError, SessionError, ViewError};
pub use export::{export, EditableView, ExportPayload};
pub use model::{
    AllocationRow, CpmRateRow, ImpressionRow, PricingModel, RateRow, RowContext, SupplyRow, ViewKind, ViewTable,
};
pub use report::{ReportOptions, ReportSummary};
pub use session::{Command, Namespace, Session};
pub use views::impression::ImpressionField;
pub use views::{EditAction, RowEdit};
