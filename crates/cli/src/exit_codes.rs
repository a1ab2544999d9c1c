//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error / records flagged          |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | input            | File, parse and settings errors          |
//! | 10-19   | views            | View preparation and export              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// `validate` found records needing review.
/// Like `diff(1)`, exit 1 means "something to look at".
pub const EXIT_VALIDATE_FLAGGED: u8 = 1;

// =============================================================================
// Input (3-9)
// =============================================================================

/// A file could not be read or written.
pub const EXIT_IO: u8 = 3;

/// A CSV input could not be parsed.
pub const EXIT_PARSE: u8 = 4;

/// The settings file is invalid.
pub const EXIT_CONFIG: u8 = 5;

// =============================================================================
// Views (10-19)
// =============================================================================

/// The requested view was not prepared (its partition has no rows).
pub const EXIT_VIEW_UNAVAILABLE: u8 = 10;

/// Edits reference ids the view does not contain (with `--strict`).
pub const EXIT_EDITS_UNKNOWN: u8 = 11;

/// Export serialization failed.
pub const EXIT_EXPORT: u8 = 12;
