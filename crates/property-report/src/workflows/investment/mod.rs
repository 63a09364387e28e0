pub mod delivery;
pub mod domain;
pub mod gateway;
pub mod metrics;
pub mod orchestrator;
pub mod rentcast;
pub mod report;

pub use delivery::{save_to_file, BrevoMailer, DeliveryError, MailTransport};
pub use domain::{
    ComparableProperty, CostParameters, Decision, InvestmentMetrics, Listing, PropertyType,
    ScreeningSettings, SearchFilters, ValuationRecord, ValueRange,
};
pub use gateway::{
    five_digit_zip, DataProviderGateway, ListingQuery, ProviderError, SearchPlan,
    ValuationRequest,
};
pub use metrics::{compute, InvalidInput, MetricsEngine, MetricsError};
pub use orchestrator::{
    BatchOrchestrator, BatchOutcome, FatalRunError, PropertyError, SkipReason, ZipCodeWarning,
};
pub use rentcast::{AvmParameters, ClientBuildError, RentcastClient};
pub use report::{format_usd, ReportAssembler, ReportDocument, RunSummary, SkippedEntry};
