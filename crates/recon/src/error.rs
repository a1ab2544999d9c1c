use std::fmt;

use crate::model::ViewKind;

/// Failure to derive a view from the raw report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// A required column could not be resolved in the report schema.
    MissingColumn { view: ViewKind, message: String },
    /// A submitted table does not line up row for row with the view.
    SubmissionMismatch { view: ViewKind, message: String },
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn { view, message } => write!(f, "{view}: {message}"),
            Self::SubmissionMismatch { view, message } => write!(f, "{view}: submission rejected: {message}"),
        }
    }
}

impl std::error::Error for ViewError {}

#[derive(Debug)]
pub enum ExportError {
    /// CSV serialization failed.
    Csv(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(msg) => write!(f, "export error: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

/// Rejected session command. State is left untouched.
#[derive(Debug)]
pub enum SessionError {
    /// The view has not been prepared (or was cleared).
    ViewNotPrepared(ViewKind),
    /// No raw partition to rebuild the view from.
    NoReport(ViewKind),
    /// A submitted edit was rejected by the view.
    Rejected(ViewError),
    Export(ExportError),
    /// A view could not be rendered as JSON.
    Render(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ViewNotPrepared(view) => write!(f, "{view} has not been prepared"),
            Self::NoReport(view) => write!(f, "no report data to rebuild {view} from"),
            Self::Rejected(e) => write!(f, "{e}"),
            Self::Export(e) => write!(f, "{e}"),
            Self::Render(msg) => write!(f, "render error: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ViewError> for SessionError {
    fn from(e: ViewError) -> Self {
        Self::Rejected(e)
    }
}

impl From<ExportError> for SessionError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}
