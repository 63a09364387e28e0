use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use property_report::config::AppConfig;
use property_report::error::AppError;
use property_report::telemetry;
use property_report::workflows::investment::{BrevoMailer, RentcastClient};
use tracing::info;

use crate::daily::{execute_run, Dispatch};

#[derive(Parser, Debug)]
#[command(
    name = "property-report",
    about = "Screen active sale listings and deliver the daily property investment report",
    version
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, value_name = "PATH", default_value = "config.toml")]
    pub config: PathBuf,
    /// Save the report to disk instead of emailing it
    #[arg(long)]
    pub dry_run: bool,
    /// Also write the HTML report to this path
    #[arg(long, value_name = "PATH")]
    pub save_html: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run() -> Result<(), AppError> {
    execute(Cli::parse())
}

fn execute(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::load(&cli.config)?;
    telemetry::init(&config.telemetry, cli.verbose)?;
    info!(
        config = %cli.config.display(),
        zip_codes = config.screening.zip_codes.len(),
        dry_run = cli.dry_run,
        "configuration loaded"
    );

    // Mail credentials are checked before the first provider call.
    let mailer = if cli.dry_run {
        None
    } else {
        let delivery = &config.delivery;
        Some(BrevoMailer::new(
            delivery.require_api_key()?,
            delivery.sender_email.as_str(),
            delivery.sender_name.as_str(),
        )?)
    };

    let client = RentcastClient::new(
        &config.provider.api_key,
        &config.provider.base_url,
        config.provider.timeout(),
        config.avm,
    )?;

    let dispatch = match &mailer {
        Some(mailer) => Dispatch::Send {
            transport: mailer,
            recipients: &config.delivery.recipients,
            subject: &config.delivery.subject,
            save_copy: cli.save_html,
        },
        None => Dispatch::DryRun {
            path: cli.save_html,
        },
    };

    let report = execute_run(
        &client,
        &config.screening,
        &config.delivery.subject,
        Local::now().naive_local(),
        dispatch,
    )?;

    println!("{}", report.summary.plain_text());
    if let Some(path) = &report.saved_to {
        println!("Report saved to {}", path.display());
    }
    if report.emailed {
        println!(
            "Report emailed to {} recipient(s)",
            config.delivery.recipients.len()
        );
    }

    Ok(())
}
