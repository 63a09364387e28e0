use std::collections::HashMap;
use std::sync::Mutex;

use property_report::workflows::investment::{
    BatchOrchestrator, CostParameters, DataProviderGateway, Decision, Listing, ListingQuery,
    PropertyType, ProviderError, ScreeningSettings, SearchFilters, SkipReason, ValuationRecord,
    ValuationRequest, ValueRange,
};

enum ListingScript {
    Listings(Vec<Listing>),
    Fail(fn() -> ProviderError),
}

enum ValuationScript {
    Record(ValuationRecord),
    Fail(fn() -> ProviderError),
}

#[derive(Default)]
struct StubGateway {
    listings: HashMap<String, ListingScript>,
    valuations: HashMap<String, ValuationScript>,
    listing_calls: Mutex<Vec<String>>,
    valuation_calls: Mutex<Vec<String>>,
}

impl std::fmt::Debug for StubGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubGateway").finish_non_exhaustive()
    }
}

impl StubGateway {
    fn with_listings(mut self, zip_code: &str, listings: Vec<Listing>) -> Self {
        self.listings
            .insert(zip_code.to_string(), ListingScript::Listings(listings));
        self
    }

    fn with_listing_failure(mut self, zip_code: &str, failure: fn() -> ProviderError) -> Self {
        self.listings
            .insert(zip_code.to_string(), ListingScript::Fail(failure));
        self
    }

    fn with_valuation(mut self, record: ValuationRecord) -> Self {
        self.valuations
            .insert(record.property_id.clone(), ValuationScript::Record(record));
        self
    }

    fn with_valuation_failure(mut self, property_id: &str, failure: fn() -> ProviderError) -> Self {
        self.valuations
            .insert(property_id.to_string(), ValuationScript::Fail(failure));
        self
    }

    fn listing_calls(&self) -> Vec<String> {
        self.listing_calls.lock().expect("listing calls").clone()
    }

    fn valuation_calls(&self) -> Vec<String> {
        self.valuation_calls.lock().expect("valuation calls").clone()
    }
}

impl DataProviderGateway for StubGateway {
    fn fetch_listings(&self, query: ListingQuery) -> Result<Vec<Listing>, ProviderError> {
        self.listing_calls
            .lock()
            .expect("listing calls")
            .push(query.zip_code().to_string());

        match self.listings.get(query.zip_code()) {
            Some(ListingScript::Listings(listings)) => Ok(listings.clone()),
            Some(ListingScript::Fail(failure)) => Err(failure()),
            None => Ok(Vec::new()),
        }
    }

    fn fetch_valuation(
        &self,
        request: &ValuationRequest,
    ) -> Result<ValuationRecord, ProviderError> {
        self.valuation_calls
            .lock()
            .expect("valuation calls")
            .push(request.property_id.clone());

        match self.valuations.get(&request.property_id) {
            Some(ValuationScript::Record(record)) => Ok(record.clone()),
            Some(ValuationScript::Fail(failure)) => Err(failure()),
            None => Ok(valuation(&request.property_id, 400_000.0)),
        }
    }
}

fn settings(zip_codes: &[&str]) -> ScreeningSettings {
    ScreeningSettings {
        zip_codes: zip_codes.iter().map(|zip| zip.to_string()).collect(),
        filters: SearchFilters {
            price: ValueRange::new(Some(100_000.0), Some(400_000.0)),
            square_footage: ValueRange::new(None, None),
            property_types: vec![PropertyType::SingleFamily],
            status: "Active".to_string(),
            limit: 500,
        },
        costs: CostParameters {
            build_up_cost_per_sqft: 75.0,
            financing_rate: 0.12,
            decision_threshold: 30_000.0,
        },
    }
}

fn listing(id: &str, zip_code: &str, square_footage: f64) -> Listing {
    Listing {
        property_id: id.to_string(),
        address: format!("{id} Market St, Austin, TX {zip_code}"),
        zip_code: zip_code.to_string(),
        list_price: 225_000.0,
        square_footage,
        property_type: Some(PropertyType::SingleFamily),
        bedrooms: Some(3),
        bathrooms: Some(2.0),
    }
}

fn valuation(id: &str, after_repair: f64) -> ValuationRecord {
    ValuationRecord {
        property_id: id.to_string(),
        current_value_low: 200_000.0,
        current_value_high: 250_000.0,
        after_repair_value: after_repair,
        low_comparables: Vec::new(),
        after_repair_comparables: Vec::new(),
    }
}

fn network_reset() -> ProviderError {
    ProviderError::Network("connection reset by peer".to_string())
}

#[test]
fn failing_zip_code_does_not_block_the_others() {
    let gateway = StubGateway::default()
        .with_listings("78701", vec![listing("a", "78701", 1_500.0)])
        .with_listing_failure("78702", network_reset)
        .with_listings("78703", vec![listing("c", "78703", 1_500.0)]);

    let outcome = BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701", "78702", "78703"]))
        .expect("run completes");

    assert_eq!(gateway.listing_calls(), vec!["78701", "78702", "78703"]);
    let analyzed: Vec<&str> = outcome.metrics.iter().map(|m| m.property_id()).collect();
    assert_eq!(analyzed, vec!["a", "c"]);
    assert_eq!(outcome.zip_warnings.len(), 1);
    assert_eq!(outcome.zip_warnings[0].zip_code, "78702");
    assert_eq!(outcome.zip_codes_attempted, 3);
    assert_eq!(outcome.zip_codes_succeeded(), 2);
}

#[test]
fn one_failed_valuation_skips_only_that_property() {
    let listings: Vec<Listing> = ["p1", "p2", "p3", "p4", "p5"]
        .iter()
        .map(|id| listing(id, "78701", 1_500.0))
        .collect();
    let gateway = StubGateway::default()
        .with_listings("78701", listings)
        .with_valuation_failure("p3", || ProviderError::NotFound("avm/value".to_string()));

    let outcome = BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701"]))
        .expect("run completes");

    let analyzed: Vec<&str> = outcome.metrics.iter().map(|m| m.property_id()).collect();
    assert_eq!(analyzed, vec!["p1", "p2", "p4", "p5"]);
    assert_eq!(outcome.property_errors.len(), 1);
    let skipped = &outcome.property_errors[0];
    assert_eq!(skipped.property_id, "p3");
    assert_eq!(skipped.address, "p3 Market St, Austin, TX 78701");
    assert_eq!(skipped.reason.category(), "not found");
    assert_eq!(outcome.listings_attempted, 5);
}

#[test]
fn each_zip_and_listing_is_requested_exactly_once() {
    let gateway = StubGateway::default()
        .with_listings(
            "78701",
            vec![listing("a", "78701", 1_400.0), listing("b", "78701", 1_600.0)],
        )
        .with_listings("78704", vec![listing("c", "78704", 2_000.0)]);

    BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701", "78704", "78701", "78704"]))
        .expect("run completes");

    assert_eq!(gateway.listing_calls(), vec!["78701", "78704"]);
    assert_eq!(gateway.valuation_calls(), vec!["a", "b", "c"]);
}

#[test]
fn invalid_square_footage_is_recorded_after_one_valuation_call() {
    let gateway = StubGateway::default().with_listings(
        "78701",
        vec![listing("zero", "78701", 0.0), listing("ok", "78701", 1_500.0)],
    );

    let outcome = BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701"]))
        .expect("run completes");

    assert_eq!(gateway.valuation_calls(), vec!["zero", "ok"]);
    assert_eq!(outcome.metrics.len(), 1);
    assert!(matches!(
        outcome.property_errors[0].reason,
        SkipReason::Metrics(_)
    ));
    assert_eq!(outcome.property_errors[0].reason.category(), "invalid input");
}

#[test]
fn rate_limits_are_per_property_and_do_not_stop_the_run() {
    let listings: Vec<Listing> = ["r1", "r2", "r3"]
        .iter()
        .map(|id| listing(id, "78701", 1_500.0))
        .collect();
    let rate_limited = || ProviderError::RateLimited {
        retry_after_secs: Some(60),
    };
    let gateway = StubGateway::default()
        .with_listings("78701", listings)
        .with_valuation_failure("r1", rate_limited)
        .with_valuation_failure("r2", rate_limited);

    let outcome = BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701"]))
        .expect("run completes");

    assert_eq!(gateway.valuation_calls(), vec!["r1", "r2", "r3"]);
    assert_eq!(outcome.property_errors.len(), 2);
    assert_eq!(outcome.metrics.len(), 1);
}

#[test]
fn authentication_failure_aborts_without_partial_output() {
    let gateway = StubGateway::default()
        .with_listings(
            "78701",
            vec![
                listing("first", "78701", 1_500.0),
                listing("denied", "78701", 1_500.0),
                listing("never", "78701", 1_500.0),
            ],
        )
        .with_listings("78702", vec![listing("later", "78702", 1_500.0)])
        .with_valuation_failure("denied", || ProviderError::Unauthorized { status: 401 });

    let err = BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701", "78702"]))
        .expect_err("run aborts");

    assert!(matches!(
        err.provider_error(),
        ProviderError::Unauthorized { status: 401 }
    ));
    assert_eq!(gateway.valuation_calls(), vec!["first", "denied"]);
    assert_eq!(gateway.listing_calls(), vec!["78701"]);
}

#[test]
fn exhausted_quota_on_listings_is_fatal() {
    let gateway = StubGateway::default()
        .with_listing_failure("78701", || {
            ProviderError::QuotaExhausted("monthly request quota reached".to_string())
        })
        .with_listings("78702", vec![listing("b", "78702", 1_500.0)]);

    let err = BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701", "78702"]))
        .expect_err("run aborts");

    assert!(err.to_string().contains("78701"));
    assert_eq!(gateway.listing_calls(), vec!["78701"]);
    assert!(gateway.valuation_calls().is_empty());
}

#[test]
fn decisions_follow_upside_profit_against_threshold() {
    let gateway = StubGateway::default()
        .with_listings(
            "78701",
            vec![listing("win", "78701", 1_500.0), listing("edge", "78701", 1_500.0)],
        )
        .with_valuation(valuation("win", 400_000.0))
        .with_valuation(valuation("edge", 380_000.0));

    let outcome = BatchOrchestrator::new(&gateway)
        .run(&settings(&["78701"]))
        .expect("run completes");

    assert_eq!(outcome.metrics[0].upside_profit(), 50_000.0);
    assert_eq!(outcome.metrics[0].decision(), Decision::Yes);
    assert_eq!(outcome.metrics[1].upside_profit(), 30_000.0);
    assert_eq!(outcome.metrics[1].decision(), Decision::No);
}
