use super::domain::{
    CostParameters, Decision, InvestmentMetrics, Listing, MetricsParts, ValuationRecord,
};

/// Reasons a listing/valuation pair cannot be turned into metrics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    #[error("square footage must be positive (got {0})")]
    NonPositiveSquareFootage(f64),
    #[error("valuation low estimate {low} exceeds high estimate {high}")]
    InvertedValueRange { low: f64, high: f64 },
    #[error("listing {listing} was paired with valuation for {valuation}")]
    PropertyMismatch { listing: String, valuation: String },
    #[error("{0} is not a finite number")]
    NonFinite(&'static str),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
}

/// Derive investment metrics for one listing.
///
/// Pure: the same inputs always give bit-identical output. Intermediate values
/// are carried at full precision; rounding is left to presentation.
pub fn compute(
    listing: &Listing,
    valuation: &ValuationRecord,
    costs: &CostParameters,
) -> Result<InvestmentMetrics, MetricsError> {
    validate(listing, valuation, costs)?;

    let best_offer_price = valuation.current_value_low;
    let build_up_cost = costs.build_up_cost_per_sqft * listing.square_footage;
    let financing_cost = costs.financing_rate * (best_offer_price + build_up_cost);
    let all_inclusive_cost = best_offer_price + build_up_cost + financing_cost;
    let upside_value = valuation.after_repair_value;
    let upside_profit = upside_value - all_inclusive_cost;
    let decision = if upside_profit > costs.decision_threshold {
        Decision::Yes
    } else {
        Decision::No
    };

    Ok(InvestmentMetrics::assemble(
        listing,
        valuation,
        MetricsParts {
            best_offer_price,
            build_up_cost,
            financing_cost,
            all_inclusive_cost,
            upside_value,
            upside_profit,
            decision,
        },
    ))
}

fn validate(
    listing: &Listing,
    valuation: &ValuationRecord,
    costs: &CostParameters,
) -> Result<(), InvalidInput> {
    if listing.property_id != valuation.property_id {
        return Err(InvalidInput::PropertyMismatch {
            listing: listing.property_id.clone(),
            valuation: valuation.property_id.clone(),
        });
    }

    let finite_checks = [
        ("square footage", listing.square_footage),
        ("list price", listing.list_price),
        ("current value low", valuation.current_value_low),
        ("current value high", valuation.current_value_high),
        ("after-repair value", valuation.after_repair_value),
        ("build-up cost per sqft", costs.build_up_cost_per_sqft),
        ("financing rate", costs.financing_rate),
        ("decision threshold", costs.decision_threshold),
    ];
    if let Some((field, _)) = finite_checks
        .into_iter()
        .find(|(_, value)| !value.is_finite())
    {
        return Err(InvalidInput::NonFinite(field));
    }

    if listing.square_footage <= 0.0 {
        return Err(InvalidInput::NonPositiveSquareFootage(
            listing.square_footage,
        ));
    }

    if valuation.current_value_low > valuation.current_value_high {
        return Err(InvalidInput::InvertedValueRange {
            low: valuation.current_value_low,
            high: valuation.current_value_high,
        });
    }

    Ok(())
}

/// Metrics engine bound to one run's cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct MetricsEngine {
    costs: CostParameters,
}

impl MetricsEngine {
    pub fn new(costs: CostParameters) -> Self {
        Self { costs }
    }

    pub fn costs(&self) -> &CostParameters {
        &self.costs
    }

    pub fn evaluate(
        &self,
        listing: &Listing,
        valuation: &ValuationRecord,
    ) -> Result<InvestmentMetrics, MetricsError> {
        compute(listing, valuation, &self.costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::investment::domain::ComparableProperty;

    fn costs() -> CostParameters {
        CostParameters {
            build_up_cost_per_sqft: 75.0,
            financing_rate: 0.12,
            decision_threshold: 30_000.0,
        }
    }

    fn listing(square_footage: f64) -> Listing {
        Listing {
            property_id: "prop-1".to_string(),
            address: "101 Main St, Austin, TX 78701".to_string(),
            zip_code: "78701".to_string(),
            list_price: 245_000.0,
            square_footage,
            property_type: None,
            bedrooms: Some(3),
            bathrooms: Some(2.0),
        }
    }

    fn valuation(low: f64, high: f64, after_repair: f64) -> ValuationRecord {
        ValuationRecord {
            property_id: "prop-1".to_string(),
            current_value_low: low,
            current_value_high: high,
            after_repair_value: after_repair,
            low_comparables: vec![ComparableProperty {
                address: "99 Main St".to_string(),
                price: Some(198_000.0),
                distance_miles: Some(0.2),
                sale_date: None,
            }],
            after_repair_comparables: Vec::new(),
        }
    }

    #[test]
    fn build_up_cost_scales_with_square_footage() {
        let metrics = compute(
            &listing(1500.0),
            &valuation(200_000.0, 250_000.0, 400_000.0),
            &costs(),
        )
        .expect("metrics compute");
        assert_eq!(metrics.build_up_cost(), 112_500.0);
    }

    #[test]
    fn derivation_matches_reference_figures() {
        let metrics = compute(
            &listing(1500.0),
            &valuation(200_000.0, 250_000.0, 400_000.0),
            &costs(),
        )
        .expect("metrics compute");

        assert_eq!(metrics.best_offer_price(), 200_000.0);
        assert_eq!(metrics.financing_cost(), 37_500.0);
        assert_eq!(metrics.all_inclusive_cost(), 350_000.0);
        assert_eq!(metrics.upside_value(), 400_000.0);
        assert_eq!(metrics.upside_profit(), 50_000.0);
        assert_eq!(metrics.decision(), Decision::Yes);
        assert_eq!(metrics.best_offer_comparables().len(), 1);
        assert_eq!(metrics.list_price(), 245_000.0);
    }

    #[test]
    fn profit_equal_to_threshold_is_not_a_yes() {
        let mut params = costs();
        params.decision_threshold = 50_000.0;
        let metrics = compute(
            &listing(1500.0),
            &valuation(200_000.0, 250_000.0, 400_000.0),
            &params,
        )
        .expect("metrics compute");
        assert_eq!(metrics.upside_profit(), 50_000.0);
        assert_eq!(metrics.decision(), Decision::No);
    }

    #[test]
    fn zero_square_footage_is_invalid_input() {
        let result = compute(
            &listing(0.0),
            &valuation(200_000.0, 250_000.0, 400_000.0),
            &costs(),
        );
        assert_eq!(
            result,
            Err(MetricsError::InvalidInput(
                InvalidInput::NonPositiveSquareFootage(0.0)
            ))
        );
    }

    #[test]
    fn inverted_estimate_range_is_invalid_input() {
        let result = compute(
            &listing(1500.0),
            &valuation(260_000.0, 250_000.0, 400_000.0),
            &costs(),
        );
        assert!(matches!(
            result,
            Err(MetricsError::InvalidInput(
                InvalidInput::InvertedValueRange { .. }
            ))
        ));
    }

    #[test]
    fn mismatched_property_ids_are_invalid_input() {
        let mut record = valuation(200_000.0, 250_000.0, 400_000.0);
        record.property_id = "prop-2".to_string();
        let result = compute(&listing(1500.0), &record, &costs());
        assert!(matches!(
            result,
            Err(MetricsError::InvalidInput(
                InvalidInput::PropertyMismatch { .. }
            ))
        ));
    }

    #[test]
    fn non_finite_estimates_are_rejected() {
        let result = compute(
            &listing(1500.0),
            &valuation(200_000.0, 250_000.0, f64::NAN),
            &costs(),
        );
        assert_eq!(
            result,
            Err(MetricsError::InvalidInput(InvalidInput::NonFinite(
                "after-repair value"
            )))
        );
    }

    #[test]
    fn repeated_evaluation_is_bit_identical() {
        let engine = MetricsEngine::new(costs());
        let listing = listing(1733.0);
        let record = valuation(187_321.17, 201_000.0, 355_450.55);

        let first = engine.evaluate(&listing, &record).expect("first pass");
        let second = engine.evaluate(&listing, &record).expect("second pass");

        assert_eq!(first, second);
        assert_eq!(
            first.upside_profit().to_bits(),
            second.upside_profit().to_bits()
        );
        assert_eq!(
            first.financing_cost().to_bits(),
            second.financing_cost().to_bits()
        );
    }
}
