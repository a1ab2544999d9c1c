//! `ratebook-core`: shared building blocks for report reconciliation.
//!
//! Raw report tables with a schema that varies per report configuration,
//! numeric coercion that never fails, declarative column resolution, and
//! the notice type used to surface non-fatal conditions to the caller.

pub mod coerce;
pub mod columns;
pub mod notice;
pub mod table;

pub use coerce::{coerce_float, coerce_int, NUMERIC_DEFAULT};
pub use columns::{ColumnSpec, Resolution};
pub use notice::{Notice, Notices, Severity};
pub use table::{RawRecord, RawTable, TableError};
