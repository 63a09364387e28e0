use serde::Serialize;
use tracing::{info, warn};

use super::html::format_usd;
use crate::workflows::investment::orchestrator::BatchOutcome;

/// Something that was attempted but did not reach the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntry {
    /// Address of the skipped property, or the zip code whose search failed.
    pub subject: String,
    pub zip_code: String,
    pub category: String,
    pub detail: String,
}

/// Counts and skip reasons for one screening run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub zip_codes_attempted: usize,
    pub zip_codes_succeeded: usize,
    pub listings_attempted: usize,
    pub listings_analyzed: usize,
    pub yes_count: usize,
    pub no_count: usize,
    /// Sum of upside profit over properties where it is positive.
    pub total_positive_upside: f64,
    pub failed_zip_codes: Vec<SkippedEntry>,
    pub skipped_properties: Vec<SkippedEntry>,
}

impl RunSummary {
    pub fn from_outcome(outcome: &BatchOutcome) -> Self {
        let yes_count = outcome
            .metrics
            .iter()
            .filter(|metrics| metrics.decision().is_yes())
            .count();
        let total_positive_upside = outcome
            .metrics
            .iter()
            .map(|metrics| metrics.upside_profit())
            .filter(|profit| *profit > 0.0)
            .sum::<f64>();

        let failed_zip_codes = outcome
            .zip_warnings
            .iter()
            .map(|warning| SkippedEntry {
                subject: format!("Zip code {}", warning.zip_code),
                zip_code: warning.zip_code.clone(),
                category: "listings unavailable".to_string(),
                detail: warning.reason.to_string(),
            })
            .collect();

        let skipped_properties = outcome
            .property_errors
            .iter()
            .map(|skip| SkippedEntry {
                subject: skip.address.clone(),
                zip_code: skip.zip_code.clone(),
                category: skip.reason.category().to_string(),
                detail: skip.reason.to_string(),
            })
            .collect();

        Self {
            zip_codes_attempted: outcome.zip_codes_attempted,
            zip_codes_succeeded: outcome.zip_codes_succeeded(),
            listings_attempted: outcome.listings_attempted,
            listings_analyzed: outcome.listings_succeeded(),
            yes_count,
            no_count: outcome.metrics.len() - yes_count,
            total_positive_upside,
            failed_zip_codes,
            skipped_properties,
        }
    }

    pub fn has_skips(&self) -> bool {
        !self.failed_zip_codes.is_empty() || !self.skipped_properties.is_empty()
    }

    pub fn log(&self) {
        info!(
            zip_codes_attempted = self.zip_codes_attempted,
            zip_codes_succeeded = self.zip_codes_succeeded,
            listings_attempted = self.listings_attempted,
            listings_analyzed = self.listings_analyzed,
            yes = self.yes_count,
            no = self.no_count,
            total_positive_upside = %format_usd(self.total_positive_upside),
            "run summary"
        );
        for entry in self.failed_zip_codes.iter().chain(&self.skipped_properties) {
            warn!(
                subject = %entry.subject,
                zip_code = %entry.zip_code,
                category = %entry.category,
                detail = %entry.detail,
                "skipped"
            );
        }
    }

    pub fn plain_text(&self) -> String {
        let mut lines = vec![
            format!(
                "Zip codes searched: {} of {}",
                self.zip_codes_succeeded, self.zip_codes_attempted
            ),
            format!(
                "Properties analyzed: {} of {}",
                self.listings_analyzed, self.listings_attempted
            ),
            format!("Recommended (Yes): {}", self.yes_count),
            format!("Not recommended (No): {}", self.no_count),
            format!(
                "Total positive upside: {}",
                format_usd(self.total_positive_upside)
            ),
        ];

        if self.has_skips() {
            lines.push(String::new());
            lines.push("Skipped:".to_string());
            for entry in self.failed_zip_codes.iter().chain(&self.skipped_properties) {
                lines.push(format!(
                    "- {} [{}]: {}",
                    entry.subject, entry.category, entry.detail
                ));
            }
        }

        lines.join("\n")
    }
}
