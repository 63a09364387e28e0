use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Residential property categories accepted by the listing search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[serde(alias = "Single Family", alias = "single-family")]
    SingleFamily,
    #[serde(alias = "Condo")]
    Condo,
    #[serde(alias = "Townhouse")]
    Townhouse,
    #[serde(alias = "Multi-Family", alias = "multi-family")]
    MultiFamily,
}

impl PropertyType {
    /// Label used by the data provider for this property type.
    pub const fn provider_label(self) -> &'static str {
        match self {
            Self::SingleFamily => "Single Family",
            Self::Condo => "Condo",
            Self::Townhouse => "Townhouse",
            Self::MultiFamily => "Multi-Family",
        }
    }

    pub fn from_provider_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single family" | "single-family" | "single_family" => Some(Self::SingleFamily),
            "condo" => Some(Self::Condo),
            "townhouse" => Some(Self::Townhouse),
            "multi-family" | "multi family" | "multi_family" => Some(Self::MultiFamily),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.provider_label())
    }
}

/// Inclusive range with optionally open ends.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueRange<T> {
    #[serde(default)]
    pub min: Option<T>,
    #[serde(default)]
    pub max: Option<T>,
}

impl<T> ValueRange<T>
where
    T: Copy + PartialOrd,
{
    pub const fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn is_ordered(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Filter criteria sent with the single listings call issued per zip code.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilters {
    pub price: ValueRange<f64>,
    pub square_footage: ValueRange<u32>,
    /// Types sent together in the one call. Empty means every type.
    pub property_types: Vec<PropertyType>,
    pub status: String,
    /// Maximum number of listings requested in the one call for a zip code.
    pub limit: u32,
}

/// Cost inputs used by the metrics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostParameters {
    pub build_up_cost_per_sqft: f64,
    pub financing_rate: f64,
    pub decision_threshold: f64,
}

/// Validated inputs for one screening run. Built once and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningSettings {
    /// Distinct zip codes in the order they are searched.
    pub zip_codes: Vec<String>,
    pub filters: SearchFilters,
    pub costs: CostParameters,
}

/// An active sale listing as returned by the data provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub property_id: String,
    pub address: String,
    pub zip_code: String,
    pub list_price: f64,
    pub square_footage: f64,
    pub property_type: Option<PropertyType>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f32>,
}

/// A sold or listed property backing a valuation estimate. Display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparableProperty {
    pub address: String,
    pub price: Option<f64>,
    pub distance_miles: Option<f64>,
    pub sale_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationRecord {
    pub property_id: String,
    pub current_value_low: f64,
    pub current_value_high: f64,
    pub after_repair_value: f64,
    pub low_comparables: Vec<ComparableProperty>,
    pub after_repair_comparables: Vec<ComparableProperty>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Decision {
    Yes,
    No,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
        }
    }

    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decision-ready figures for one listing.
///
/// Only the metrics engine builds these; every field is read through an
/// accessor so a record cannot change after it has been produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentMetrics {
    property_id: String,
    address: String,
    zip_code: String,
    list_price: f64,
    best_offer_price: f64,
    build_up_cost: f64,
    financing_cost: f64,
    all_inclusive_cost: f64,
    upside_value: f64,
    upside_profit: f64,
    decision: Decision,
    best_offer_comparables: Vec<ComparableProperty>,
    upside_comparables: Vec<ComparableProperty>,
}

pub(crate) struct MetricsParts {
    pub(crate) best_offer_price: f64,
    pub(crate) build_up_cost: f64,
    pub(crate) financing_cost: f64,
    pub(crate) all_inclusive_cost: f64,
    pub(crate) upside_value: f64,
    pub(crate) upside_profit: f64,
    pub(crate) decision: Decision,
}

impl InvestmentMetrics {
    pub(crate) fn assemble(
        listing: &Listing,
        valuation: &ValuationRecord,
        parts: MetricsParts,
    ) -> Self {
        Self {
            property_id: listing.property_id.clone(),
            address: listing.address.clone(),
            zip_code: listing.zip_code.clone(),
            list_price: listing.list_price,
            best_offer_price: parts.best_offer_price,
            build_up_cost: parts.build_up_cost,
            financing_cost: parts.financing_cost,
            all_inclusive_cost: parts.all_inclusive_cost,
            upside_value: parts.upside_value,
            upside_profit: parts.upside_profit,
            decision: parts.decision,
            best_offer_comparables: valuation.low_comparables.clone(),
            upside_comparables: valuation.after_repair_comparables.clone(),
        }
    }

    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn zip_code(&self) -> &str {
        &self.zip_code
    }

    pub fn list_price(&self) -> f64 {
        self.list_price
    }

    pub fn best_offer_price(&self) -> f64 {
        self.best_offer_price
    }

    pub fn build_up_cost(&self) -> f64 {
        self.build_up_cost
    }

    pub fn financing_cost(&self) -> f64 {
        self.financing_cost
    }

    pub fn all_inclusive_cost(&self) -> f64 {
        self.all_inclusive_cost
    }

    pub fn upside_value(&self) -> f64 {
        self.upside_value
    }

    pub fn upside_profit(&self) -> f64 {
        self.upside_profit
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn best_offer_comparables(&self) -> &[ComparableProperty] {
        &self.best_offer_comparables
    }

    pub fn upside_comparables(&self) -> &[ComparableProperty] {
        &self.upside_comparables
    }
}
