mod brevo;

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::report::ReportDocument;

pub use brevo::{BrevoMailer, BREVO_ENDPOINT};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("no recipients configured")]
    NoRecipients,
    #[error("mail request failed: {0}")]
    Transport(String),
    #[error("mail service rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to write report to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Sends a rendered report to a list of recipients.
pub trait MailTransport: Debug {
    fn deliver(
        &self,
        document: &ReportDocument,
        recipients: &[String],
        subject: &str,
    ) -> Result<(), DeliveryError>;
}

/// Write the HTML report to `path`, creating parent directories as needed.
pub fn save_to_file(document: &ReportDocument, path: &Path) -> Result<PathBuf, DeliveryError> {
    let io_error = |source: std::io::Error| DeliveryError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, document.html.as_bytes()).map_err(io_error)?;

    info!(path = %path.display(), bytes = document.html.len(), "report saved");
    Ok(path.to_path_buf())
}
