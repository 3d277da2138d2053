//! Build summaries and stable exit codes

mod build_summary;
mod exit;

pub use build_summary::{BuildSummary, SUMMARY_SCHEMA_ID, SUMMARY_SCHEMA_VERSION};
pub use exit::{ExitCode, Status};
