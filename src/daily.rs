use std::path::PathBuf;

use chrono::NaiveDateTime;
use property_report::error::AppError;
use property_report::workflows::investment::{
    save_to_file, BatchOrchestrator, DataProviderGateway, MailTransport, ReportAssembler,
    ReportDocument, RunSummary, ScreeningSettings,
};
use tracing::{info, warn};

/// What to do with the finished report.
#[derive(Debug)]
pub enum Dispatch<'a> {
    /// Save to `path`, or to a timestamped file in the working directory.
    DryRun { path: Option<PathBuf> },
    /// Email the report, optionally keeping a copy on disk.
    Send {
        transport: &'a dyn MailTransport,
        recipients: &'a [String],
        subject: &'a str,
        save_copy: Option<PathBuf>,
    },
}

/// Result of one daily run that reached the delivery step.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    /// `None` when no property could be analyzed.
    pub document: Option<ReportDocument>,
    pub saved_to: Option<PathBuf>,
    pub emailed: bool,
}

/// Screen every configured zip code, render the report, and dispatch it.
pub fn execute_run<G>(
    gateway: &G,
    settings: &ScreeningSettings,
    title: &str,
    generated_at: NaiveDateTime,
    dispatch: Dispatch<'_>,
) -> Result<RunReport, AppError>
where
    G: DataProviderGateway + ?Sized,
{
    let outcome = BatchOrchestrator::new(gateway).run(settings)?;
    let summary = RunSummary::from_outcome(&outcome);
    summary.log();

    if outcome.metrics.is_empty() {
        warn!("no properties were analyzed; skipping report delivery");
        return Ok(RunReport {
            summary,
            document: None,
            saved_to: None,
            emailed: false,
        });
    }

    let document = ReportAssembler::new(settings.costs, generated_at)
        .with_title(title)
        .render(&outcome.metrics, &summary);

    let (saved_to, emailed) = match dispatch {
        Dispatch::DryRun { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(document.default_file_name()));
            info!(path = %path.display(), "dry run; saving report instead of sending");
            (Some(save_to_file(&document, &path)?), false)
        }
        Dispatch::Send {
            transport,
            recipients,
            subject,
            save_copy,
        } => {
            let saved = save_copy
                .map(|path| save_to_file(&document, &path))
                .transpose()?;
            transport.deliver(&document, recipients, subject)?;
            (saved, true)
        }
    };

    Ok(RunReport {
        summary,
        document: Some(document),
        saved_to,
        emailed,
    })
}
