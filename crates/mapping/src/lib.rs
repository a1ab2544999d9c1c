//! `ratebook-mapping`: canonicalization of free-text category values.
//!
//! Pure crate: takes already-parsed master lists (or already-read sheets)
//! and typed records, returns matches, suggestions and validation reports.

pub mod ingest;
pub mod mapper;
pub mod master;
pub mod similarity;
pub mod validator;

pub use ingest::{IngestError, IngestionLog, IngestionRecord, PriceType, RecordDraft};
pub use mapper::{Mapper, MatchOptions, MatchResult, Suggestion};
pub use master::{Category, MasterList, MasterLists};
pub use similarity::{Similarity, TokenSortRatio};
pub use validator::{validate_records, ValidationReport};
