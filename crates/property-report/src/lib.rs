//! Daily investment screening for residential sale listings.
//!
//! The crate is organised around the investment analysis pipeline in
//! [`workflows::investment`]: listings and valuations are pulled through a
//! [`workflows::investment::DataProviderGateway`], turned into
//! [`workflows::investment::InvestmentMetrics`] by the metrics engine, and
//! rendered into a report that can be mailed or saved to disk.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
