use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::info;

use super::{DeliveryError, MailTransport};
use crate::workflows::investment::report::ReportDocument;

/// Brevo v3 transactional email endpoint.
pub const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct BrevoMailer {
    client: Client,
    api_key: String,
    sender_email: String,
    sender_name: String,
    endpoint: String,
}

impl fmt::Debug for BrevoMailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrevoMailer")
            .field("sender_email", &self.sender_email)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl BrevoMailer {
    pub fn new(
        api_key: impl Into<String>,
        sender_email: impl Into<String>,
        sender_name: impl Into<String>,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            sender_email: sender_email.into(),
            sender_name: sender_name.into(),
            endpoint: BREVO_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request_body(&self, document: &ReportDocument, recipients: &[String], subject: &str) -> Value {
        let to: Vec<Value> = recipients
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();

        json!({
            "sender": {
                "name": self.sender_name,
                "email": self.sender_email
            },
            "to": to,
            "subject": subject,
            "htmlContent": document.html,
            "textContent": document.text
        })
    }
}

impl MailTransport for BrevoMailer {
    fn deliver(
        &self,
        document: &ReportDocument,
        recipients: &[String],
        subject: &str,
    ) -> Result<(), DeliveryError> {
        if recipients.is_empty() {
            return Err(DeliveryError::NoRecipients);
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&self.request_body(document, recipients, subject))
            .send()
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(recipients = recipients.len(), %subject, "report emailed");
        Ok(())
    }
}
