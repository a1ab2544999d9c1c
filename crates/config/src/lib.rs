// Configuration loading

pub mod settings;

pub use settings::{Abbreviation, ConfigError, MatchSettings, ReportSettings, Settings};
