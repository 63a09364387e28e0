use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::domain::{ComparableProperty, Listing, PropertyType, ValuationRecord};
use super::gateway::{DataProviderGateway, ListingQuery, ProviderError, ValuationRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.rentcast.io/v1";

const API_KEY_HEADER: &str = "x-api-key";
const LISTINGS_ENDPOINT: &str = "listings/sale";
const VALUATION_ENDPOINT: &str = "avm/value";
/// Comparables kept per valuation for the report.
pub(crate) const DISPLAY_COMPARABLES: usize = 5;

/// Comparable-selection knobs sent with every valuation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvmParameters {
    pub max_radius_miles: f64,
    pub days_old: u32,
    pub comp_count: u32,
    /// Added to the subject's square footage so the estimate reflects the
    /// finished, built-up property.
    pub square_footage_uplift: u32,
}

impl Default for AvmParameters {
    fn default() -> Self {
        Self {
            max_radius_miles: 1.0,
            days_old: 365,
            comp_count: 10,
            square_footage_uplift: 400,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("API key contains characters that cannot be sent in an HTTP header")]
    InvalidApiKey,
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Blocking client for the Rentcast sale-listing and AVM endpoints.
///
/// Each gateway method issues exactly one HTTP request; there is no retry
/// loop here.
pub struct RentcastClient {
    client: Client,
    base_url: String,
    avm: AvmParameters,
}

impl fmt::Debug for RentcastClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RentcastClient")
            .field("base_url", &self.base_url)
            .field("avm", &self.avm)
            .finish_non_exhaustive()
    }
}

impl RentcastClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
        avm: AvmParameters,
    ) -> Result<Self, ClientBuildError> {
        let mut key =
            HeaderValue::from_str(api_key.trim()).map_err(|_| ClientBuildError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            avm,
        })
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, ?params, "provider request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .map_err(|err| ProviderError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_secs(&response);
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status, retry_after, body, endpoint));
        }

        let body = response
            .text()
            .map_err(|err| ProviderError::Network(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| ProviderError::Malformed(err.to_string()))
    }
}

impl DataProviderGateway for RentcastClient {
    fn fetch_listings(&self, query: ListingQuery) -> Result<Vec<Listing>, ProviderError> {
        let params = listing_params(&query);
        info!(zip_code = query.zip_code(), "fetching sale listings");

        let raw: Vec<RentcastListing> = self.get(LISTINGS_ENDPOINT, &params)?;
        let returned = raw.len();
        if returned as u64 >= u64::from(query.filters().limit) {
            warn!(
                zip_code = query.zip_code(),
                limit = query.filters().limit,
                "listing results reached the request limit and may be truncated"
            );
        }

        let listings: Vec<Listing> = raw
            .into_iter()
            .filter_map(|entry| entry.into_listing(query.zip_code()))
            .collect();
        if listings.len() < returned {
            warn!(
                zip_code = query.zip_code(),
                dropped = returned - listings.len(),
                "ignored listings without an address"
            );
        }

        Ok(listings)
    }

    fn fetch_valuation(
        &self,
        request: &ValuationRequest,
    ) -> Result<ValuationRecord, ProviderError> {
        debug!(address = %request.address, "fetching value estimate");
        let raw: RentcastValuation =
            self.get(VALUATION_ENDPOINT, &valuation_params(request, &self.avm))?;
        raw.into_record(&request.property_id)
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

pub(crate) fn classify_status(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: String,
    endpoint: &str,
) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized {
            status: status.as_u16(),
        },
        StatusCode::PAYMENT_REQUIRED => ProviderError::QuotaExhausted(if body.is_empty() {
            status.to_string()
        } else {
            body
        }),
        StatusCode::NOT_FOUND => ProviderError::NotFound(format!("no data from {endpoint}")),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after_secs },
        other => ProviderError::UnexpectedStatus {
            status: other.as_u16(),
            body,
        },
    }
}

/// Build the `min:max` range syntax, with `*` for an open end.
fn range_param(min: Option<String>, max: Option<String>) -> Option<String> {
    if min.is_none() && max.is_none() {
        return None;
    }
    Some(format!(
        "{}:{}",
        min.unwrap_or_else(|| "*".to_string()),
        max.unwrap_or_else(|| "*".to_string())
    ))
}

pub(crate) fn listing_params(query: &ListingQuery) -> Vec<(&'static str, String)> {
    let filters = query.filters();
    let mut params = vec![("zipCode", query.zip_code().to_string())];
    if !filters.property_types.is_empty() {
        let labels: Vec<&str> = filters
            .property_types
            .iter()
            .map(|kind| kind.provider_label())
            .collect();
        params.push(("propertyType", labels.join(",")));
    }

    let whole_dollars = |value: f64| format!("{:.0}", value.trunc());
    if let Some(price) = range_param(
        filters.price.min.map(whole_dollars),
        filters.price.max.map(whole_dollars),
    ) {
        params.push(("price", price));
    }
    if let Some(sqft) = range_param(
        filters.square_footage.min.map(|v| v.to_string()),
        filters.square_footage.max.map(|v| v.to_string()),
    ) {
        params.push(("squareFootage", sqft));
    }

    params.push(("status", filters.status.clone()));
    params.push(("limit", filters.limit.to_string()));
    params.push(("offset", "0".to_string()));
    params
}

pub(crate) fn valuation_params(
    request: &ValuationRequest,
    avm: &AvmParameters,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("address", request.address.clone())];
    if let Some(kind) = request.property_type {
        params.push(("propertyType", kind.provider_label().to_string()));
    }
    if let Some(bedrooms) = request.bedrooms {
        params.push(("bedrooms", bedrooms.to_string()));
    }
    if let Some(bathrooms) = request.bathrooms {
        params.push(("bathrooms", bathrooms.to_string()));
    }
    if request.square_footage > 0.0 {
        let adjusted = request.square_footage + f64::from(avm.square_footage_uplift);
        params.push(("squareFootage", format!("{adjusted:.0}")));
    }
    params.push(("maxRadius", avm.max_radius_miles.to_string()));
    params.push(("daysOld", avm.days_old.to_string()));
    params.push(("compCount", avm.comp_count.to_string()));
    params.push(("lookupSubjectAttributes", "true".to_string()));
    params
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentcastListing {
    id: Option<String>,
    formatted_address: Option<String>,
    zip_code: Option<String>,
    price: Option<f64>,
    square_footage: Option<f64>,
    property_type: Option<String>,
    bedrooms: Option<f64>,
    bathrooms: Option<f32>,
}

impl RentcastListing {
    fn into_listing(self, searched_zip: &str) -> Option<Listing> {
        let address = self
            .formatted_address
            .filter(|address| !address.trim().is_empty())?;
        let property_id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| address.clone());

        Some(Listing {
            property_id,
            address,
            zip_code: self.zip_code.unwrap_or_else(|| searched_zip.to_string()),
            list_price: self.price.unwrap_or(0.0),
            square_footage: self.square_footage.unwrap_or(0.0),
            property_type: self
                .property_type
                .as_deref()
                .and_then(PropertyType::from_provider_label),
            bedrooms: self
                .bedrooms
                .filter(|beds| beds.is_finite() && *beds >= 0.0)
                .map(|beds| beds.round() as u32),
            bathrooms: self.bathrooms,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentcastValuation {
    price: Option<f64>,
    price_range_low: Option<f64>,
    price_range_high: Option<f64>,
    #[serde(default)]
    comparables: Vec<RentcastComparable>,
}

impl RentcastValuation {
    fn into_record(self, property_id: &str) -> Result<ValuationRecord, ProviderError> {
        let low = self.price_range_low.or(self.price).ok_or_else(|| {
            ProviderError::Malformed("value estimate is missing priceRangeLow".to_string())
        })?;
        let high = self.price_range_high.or(self.price).ok_or_else(|| {
            ProviderError::Malformed("value estimate is missing priceRangeHigh".to_string())
        })?;

        // The AVM returns one comparable set; it backs both estimates.
        let comparables: Vec<ComparableProperty> = self
            .comparables
            .into_iter()
            .filter_map(RentcastComparable::into_comparable)
            .take(DISPLAY_COMPARABLES)
            .collect();

        Ok(ValuationRecord {
            property_id: property_id.to_string(),
            current_value_low: low,
            current_value_high: high,
            after_repair_value: high,
            low_comparables: comparables.clone(),
            after_repair_comparables: comparables,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RentcastComparable {
    formatted_address: Option<String>,
    price: Option<f64>,
    distance: Option<f64>,
    removed_date: Option<String>,
    last_seen_date: Option<String>,
    listed_date: Option<String>,
}

impl RentcastComparable {
    fn into_comparable(self) -> Option<ComparableProperty> {
        let address = self.formatted_address?;
        let sale_date = [self.removed_date, self.last_seen_date, self.listed_date]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_provider_date(&raw));

        Some(ComparableProperty {
            address,
            price: self.price,
            distance_miles: self.distance,
            sale_date,
        })
    }
}

fn parse_provider_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.date_naive());
    }

    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
