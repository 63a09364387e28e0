mod html;
mod summary;

use chrono::NaiveDateTime;

pub use html::{format_usd, ReportAssembler, DEFAULT_TITLE};
pub use summary::{RunSummary, SkippedEntry};

/// A rendered report ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub generated_at: NaiveDateTime,
    pub html: String,
    /// Plain-text alternative sent alongside the HTML body.
    pub text: String,
}

impl ReportDocument {
    /// Default file name used when a dry run does not name one.
    pub fn default_file_name(&self) -> String {
        format!(
            "property_report_{}.html",
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }
}
