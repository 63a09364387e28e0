use std::collections::HashSet;
use std::fmt::Debug;

use super::domain::{Listing, PropertyType, SearchFilters, ValuationRecord};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider rejected the API key (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("rate limited by provider{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("provider quota exhausted: {0}")]
    QuotaExhausted(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl ProviderError {
    /// Fatal errors abort the whole run instead of skipping one property or
    /// zip code. Bad credentials and an exhausted plan quota will fail every
    /// subsequent call the same way.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::QuotaExhausted(_))
    }
}

/// The single listings request allowed for one zip code.
///
/// Queries are only produced by [`SearchPlan`] and are consumed by
/// [`DataProviderGateway::fetch_listings`], so a run cannot issue a second
/// listings call for a zip code it has already searched.
#[derive(Debug, PartialEq)]
pub struct ListingQuery {
    zip_code: String,
    filters: SearchFilters,
}

impl ListingQuery {
    pub fn zip_code(&self) -> &str {
        &self.zip_code
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }
}

/// One listings query per distinct zip code, in configured order.
#[derive(Debug)]
pub struct SearchPlan {
    queries: Vec<ListingQuery>,
}

impl SearchPlan {
    /// ZIP+4 entries are searched as their 5-digit zip code, so `78701` and
    /// `78701-1234` share one query.
    pub fn new<S: AsRef<str>>(zip_codes: &[S], filters: &SearchFilters) -> Self {
        let mut seen = HashSet::new();
        let queries = zip_codes
            .iter()
            .map(|zip| five_digit_zip(zip.as_ref()))
            .filter(|zip| !zip.is_empty() && seen.insert(zip.to_string()))
            .map(|zip| ListingQuery {
                zip_code: zip.to_string(),
                filters: filters.clone(),
            })
            .collect();

        Self { queries }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn zip_codes(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(ListingQuery::zip_code)
    }
}

/// The 5-digit zip code of a plain or ZIP+4 value.
pub fn five_digit_zip(zip: &str) -> &str {
    let zip = zip.trim();
    zip.split_once('-').map_or(zip, |(base, _)| base)
}

impl IntoIterator for SearchPlan {
    type Item = ListingQuery;
    type IntoIter = std::vec::IntoIter<ListingQuery>;

    fn into_iter(self) -> Self::IntoIter {
        self.queries.into_iter()
    }
}

/// Subject attributes forwarded with a valuation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationRequest {
    pub property_id: String,
    pub address: String,
    pub property_type: Option<PropertyType>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f32>,
    pub square_footage: f64,
}

impl ValuationRequest {
    pub fn for_listing(listing: &Listing) -> Self {
        Self {
            property_id: listing.property_id.clone(),
            address: listing.address.clone(),
            property_type: listing.property_type,
            bedrooms: listing.bedrooms,
            bathrooms: listing.bathrooms,
            square_footage: listing.square_footage,
        }
    }
}

/// Source of listings and valuations for the batch orchestrator.
pub trait DataProviderGateway: Debug {
    /// Return every listing matching the query's filters in one call.
    fn fetch_listings(&self, query: ListingQuery) -> Result<Vec<Listing>, ProviderError>;

    fn fetch_valuation(&self, request: &ValuationRequest)
        -> Result<ValuationRecord, ProviderError>;
}
