use tracing::{debug, error, info, warn};

use super::domain::{InvestmentMetrics, Listing, ScreeningSettings};
use super::gateway::{DataProviderGateway, ProviderError, SearchPlan, ValuationRequest};
use super::metrics::{MetricsEngine, MetricsError};

/// Why a single listing was left out of the report.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error(transparent)]
    Valuation(#[from] ProviderError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl SkipReason {
    /// Short category shown next to each skipped property.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Valuation(ProviderError::Network(_)) => "network",
            Self::Valuation(ProviderError::RateLimited { .. }) => "rate limit",
            Self::Valuation(ProviderError::NotFound(_)) => "not found",
            Self::Valuation(ProviderError::Malformed(_)) => "malformed response",
            Self::Valuation(_) => "provider error",
            Self::Metrics(_) => "invalid input",
        }
    }
}

/// A listing whose valuation or metrics could not be produced.
#[derive(Debug, thiserror::Error)]
#[error("{address} ({property_id}): {reason}")]
pub struct PropertyError {
    pub property_id: String,
    pub address: String,
    pub zip_code: String,
    pub reason: SkipReason,
}

impl PropertyError {
    fn new(listing: &Listing, reason: SkipReason) -> Self {
        Self {
            property_id: listing.property_id.clone(),
            address: listing.address.clone(),
            zip_code: listing.zip_code.clone(),
            reason,
        }
    }
}

/// A zip code whose listings call failed; its listings were never seen.
#[derive(Debug, thiserror::Error)]
#[error("zip code {zip_code}: {reason}")]
pub struct ZipCodeWarning {
    pub zip_code: String,
    pub reason: ProviderError,
}

/// Error that stops the run before any report is produced.
#[derive(Debug, thiserror::Error)]
#[error("{context}: {source}")]
pub struct FatalRunError {
    context: String,
    source: ProviderError,
}

impl FatalRunError {
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn provider_error(&self) -> &ProviderError {
        &self.source
    }
}

/// Everything one run produced, in production order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub metrics: Vec<InvestmentMetrics>,
    pub property_errors: Vec<PropertyError>,
    pub zip_warnings: Vec<ZipCodeWarning>,
    pub zip_codes_attempted: usize,
    pub listings_attempted: usize,
}

impl BatchOutcome {
    pub fn zip_codes_succeeded(&self) -> usize {
        self.zip_codes_attempted - self.zip_warnings.len()
    }

    pub fn listings_succeeded(&self) -> usize {
        self.metrics.len()
    }

    fn record(&mut self, outcome: ListingOutcome) {
        self.listings_attempted += 1;
        match outcome {
            ListingOutcome::Analyzed(metrics) => self.metrics.push(metrics),
            ListingOutcome::Skipped(skip) => self.property_errors.push(skip),
        }
    }
}

enum ListingOutcome {
    Analyzed(InvestmentMetrics),
    Skipped(PropertyError),
}

/// Drives the metrics engine across every configured zip code.
///
/// Issues one listings call per distinct zip code and one valuation call per
/// returned listing. Per-listing and per-zip failures are recorded and the
/// run continues; only fatal provider errors abort it.
#[derive(Debug)]
pub struct BatchOrchestrator<'a, G: ?Sized> {
    gateway: &'a G,
}

impl<'a, G> BatchOrchestrator<'a, G>
where
    G: DataProviderGateway + ?Sized,
{
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    pub fn run(&self, settings: &ScreeningSettings) -> Result<BatchOutcome, FatalRunError> {
        let engine = MetricsEngine::new(settings.costs);
        let plan = SearchPlan::new(settings.zip_codes.as_slice(), &settings.filters);
        info!(zip_codes = plan.len(), "starting screening run");

        let mut outcome = BatchOutcome::default();
        for query in plan {
            let zip_code = query.zip_code().to_string();
            outcome.zip_codes_attempted += 1;

            let listings = match self.gateway.fetch_listings(query) {
                Ok(listings) => listings,
                Err(source) if source.is_fatal() => {
                    error!(%zip_code, error = %source, "listings call failed fatally");
                    return Err(FatalRunError {
                        context: format!("fetching listings for zip code {zip_code}"),
                        source,
                    });
                }
                Err(reason) => {
                    warn!(%zip_code, error = %reason, "listings call failed; skipping zip code");
                    outcome.zip_warnings.push(ZipCodeWarning { zip_code, reason });
                    continue;
                }
            };
            info!(%zip_code, listings = listings.len(), "listings retrieved");

            outcome = listings.iter().try_fold(
                outcome,
                |mut acc, listing| -> Result<BatchOutcome, FatalRunError> {
                    acc.record(self.screen_listing(&engine, listing)?);
                    Ok(acc)
                },
            )?;
        }

        info!(
            analyzed = outcome.metrics.len(),
            skipped = outcome.property_errors.len(),
            zip_warnings = outcome.zip_warnings.len(),
            "screening run finished"
        );
        Ok(outcome)
    }

    fn screen_listing(
        &self,
        engine: &MetricsEngine,
        listing: &Listing,
    ) -> Result<ListingOutcome, FatalRunError> {
        let request = ValuationRequest::for_listing(listing);
        let valuation = match self.gateway.fetch_valuation(&request) {
            Ok(valuation) => valuation,
            Err(source) if source.is_fatal() => {
                error!(
                    property_id = %listing.property_id,
                    error = %source,
                    "valuation call failed fatally"
                );
                return Err(FatalRunError {
                    context: format!("fetching valuation for {}", listing.address),
                    source,
                });
            }
            Err(err) => {
                warn!(
                    property_id = %listing.property_id,
                    error = %err,
                    "valuation failed; skipping property"
                );
                return Ok(ListingOutcome::Skipped(PropertyError::new(
                    listing,
                    err.into(),
                )));
            }
        };

        match engine.evaluate(listing, &valuation) {
            Ok(metrics) => {
                debug!(
                    property_id = %listing.property_id,
                    upside_profit = metrics.upside_profit(),
                    decision = %metrics.decision(),
                    "property analyzed"
                );
                Ok(ListingOutcome::Analyzed(metrics))
            }
            Err(err) => {
                warn!(
                    property_id = %listing.property_id,
                    error = %err,
                    "metrics rejected input; skipping property"
                );
                Ok(ListingOutcome::Skipped(PropertyError::new(
                    listing,
                    err.into(),
                )))
            }
        }
    }
}
