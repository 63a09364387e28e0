use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::workflows::investment::domain::{
    CostParameters, PropertyType, ScreeningSettings, SearchFilters, ValueRange,
};
use crate::workflows::investment::gateway::five_digit_zip;
use crate::workflows::investment::rentcast::{AvmParameters, DEFAULT_BASE_URL};

pub const PROVIDER_API_KEY_VAR: &str = "RENTCAST_API_KEY";
pub const MAIL_API_KEY_VAR: &str = "BREVO_API_KEY";
pub const LOG_LEVEL_VAR: &str = "REPORT_LOG_LEVEL";

const DEFAULT_SUBJECT: &str = "Daily Property Investment Report";
const DEFAULT_SENDER_NAME: &str = "Property Reports";
const DEFAULT_LISTING_LIMIT: u32 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level configuration for a report run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub screening: ScreeningSettings,
    pub avm: AvmParameters,
    pub delivery: DeliveryConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Read the TOML file at `path`, then apply `.env` and environment
    /// overrides for secrets and the log level.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = parse(&raw)?;

        if let Some(key) = env_override(PROVIDER_API_KEY_VAR) {
            file.provider.api_key = Some(key);
        }
        if let Some(key) = env_override(MAIL_API_KEY_VAR) {
            file.delivery.api_key = Some(key);
        }
        if let Some(level) = env_override(LOG_LEVEL_VAR) {
            file.telemetry.log_level = Some(level);
        }

        Self::from_file(file)
    }

    /// Build a configuration from TOML text alone, without consulting the
    /// environment.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::from_file(parse(raw)?)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let provider = ProviderConfig {
            api_key: non_empty(file.provider.api_key)
                .ok_or(ConfigError::MissingValue("provider.api_key"))?,
            base_url: non_empty(file.provider.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs: file.provider.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        let mut filter_section = file.filters;
        let zip_codes = std::mem::take(&mut filter_section.zip_codes);
        let filters = search_filters(filter_section)?;
        let screening = ScreeningSettings {
            zip_codes: validate_zip_codes(zip_codes.into_vec())?,
            filters,
            costs: cost_parameters(&file.costs, &file.decision)?,
        };

        let defaults = AvmParameters::default();
        let avm = AvmParameters {
            max_radius_miles: file.avm.max_radius.unwrap_or(defaults.max_radius_miles),
            days_old: file.avm.days_old.unwrap_or(defaults.days_old),
            comp_count: file.avm.comp_count.unwrap_or(defaults.comp_count),
            square_footage_uplift: file
                .avm
                .square_footage_uplift
                .unwrap_or(defaults.square_footage_uplift),
        };
        if !avm.max_radius_miles.is_finite() || avm.max_radius_miles <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "avm.max_radius",
                reason: "must be a positive number of miles".to_string(),
            });
        }

        let delivery = delivery_config(file.delivery)?;
        let telemetry = TelemetryConfig {
            log_level: non_empty(file.telemetry.log_level).unwrap_or_else(|| "info".to_string()),
        };

        Ok(Self {
            provider,
            screening,
            avm,
            delivery,
            telemetry,
        })
    }
}

/// Data provider connection settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Where and how the finished report is sent.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub api_key: Option<String>,
    pub sender_email: String,
    pub sender_name: String,
    pub recipients: Vec<String>,
    pub subject: String,
}

impl DeliveryConfig {
    /// The mail API key is only needed when the report is actually sent.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingValue("delivery.api_key"))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    MissingValue(&'static str),
    NoZipCodes,
    InvalidZipCode(String),
    InvertedRange(&'static str),
    InvalidFinancingRate(f64),
    InvalidValue {
        field: &'static str,
        reason: String,
    },
    NoRecipients,
    InvalidEmail(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, .. } => {
                write!(f, "unable to read config file {}", path.display())
            }
            ConfigError::Parse(err) => write!(f, "config file is not valid TOML: {err}"),
            ConfigError::MissingValue(field) => match *field {
                "provider.api_key" => write!(
                    f,
                    "{field} must be set in the config file or {PROVIDER_API_KEY_VAR}"
                ),
                "delivery.api_key" => write!(
                    f,
                    "{field} must be set in the config file or {MAIL_API_KEY_VAR}"
                ),
                _ => write!(f, "{field} must be set"),
            },
            ConfigError::NoZipCodes => write!(f, "filters.zip_codes must list at least one zip code"),
            ConfigError::InvalidZipCode(zip) => write!(
                f,
                "zip code '{zip}' must be 5 digits with an optional -dddd suffix"
            ),
            ConfigError::InvertedRange(field) => {
                write!(f, "{field}: minimum must not exceed maximum")
            }
            ConfigError::InvalidFinancingRate(rate) => write!(
                f,
                "costs.financing_rate must be a fraction in [0, 1) (got {rate})"
            ),
            ConfigError::InvalidValue { field, reason } => write!(f, "{field} {reason}"),
            ConfigError::NoRecipients => {
                write!(f, "delivery.recipients must list at least one address")
            }
            ConfigError::InvalidEmail(address) => {
                write!(f, "'{address}' is not a valid email address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    provider: ProviderSection,
    filters: FilterSection,
    avm: AvmSection,
    costs: CostSection,
    decision: DecisionSection,
    delivery: DeliverySection,
    telemetry: TelemetrySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderSection {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilterSection {
    zip_codes: StringList,
    min_price: Option<f64>,
    max_price: Option<f64>,
    min_square_footage: Option<u32>,
    max_square_footage: Option<u32>,
    #[serde(alias = "property_type")]
    property_types: StringList,
    status: Option<String>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AvmSection {
    max_radius: Option<f64>,
    days_old: Option<u32>,
    comp_count: Option<u32>,
    square_footage_uplift: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CostSection {
    build_up_cost_per_sqft: Option<f64>,
    financing_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DecisionSection {
    threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeliverySection {
    api_key: Option<String>,
    sender_email: Option<String>,
    sender_name: Option<String>,
    recipients: StringList,
    subject: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TelemetrySection {
    log_level: Option<String>,
}

/// A list written either as a TOML array or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringList {
    Many(Vec<String>),
    Joined(String),
}

impl Default for StringList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl StringList {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            Self::Many(items) => items,
            Self::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

fn parse(raw: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(raw).map_err(ConfigError::Parse)
}

fn env_override(name: &str) -> Option<String> {
    non_empty(env::var(name).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn is_valid_zip(zip: &str) -> bool {
    let all_digits = |part: &str, len: usize| {
        part.len() == len && part.bytes().all(|byte| byte.is_ascii_digit())
    };

    match zip.split_once('-') {
        Some((base, extension)) => all_digits(base, 5) && all_digits(extension, 4),
        None => all_digits(zip, 5),
    }
}

/// ZIP+4 entries are kept as their 5-digit zip code, which is what the
/// listings search accepts.
fn validate_zip_codes(zip_codes: Vec<String>) -> Result<Vec<String>, ConfigError> {
    let mut distinct: Vec<String> = Vec::with_capacity(zip_codes.len());
    for zip in zip_codes {
        if !is_valid_zip(&zip) {
            return Err(ConfigError::InvalidZipCode(zip));
        }
        let zip = five_digit_zip(&zip).to_string();
        if !distinct.contains(&zip) {
            distinct.push(zip);
        }
    }

    if distinct.is_empty() {
        return Err(ConfigError::NoZipCodes);
    }
    Ok(distinct)
}

fn property_types(raw: StringList) -> Result<Vec<PropertyType>, ConfigError> {
    let mut kinds = Vec::new();
    for label in raw.into_vec() {
        let kind =
            PropertyType::from_provider_label(&label).ok_or_else(|| ConfigError::InvalidValue {
                field: "filters.property_types",
                reason: format!(
                    "has unknown type {label:?} (use Single Family, Condo, Townhouse or Multi-Family)"
                ),
            })?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn search_filters(section: FilterSection) -> Result<SearchFilters, ConfigError> {
    let price = ValueRange::new(section.min_price, section.max_price);
    if [price.min, price.max]
        .into_iter()
        .flatten()
        .any(|bound| !bound.is_finite() || bound < 0.0)
    {
        return Err(ConfigError::InvalidValue {
            field: "filters price",
            reason: "bounds must be non-negative numbers".to_string(),
        });
    }
    if !price.is_ordered() {
        return Err(ConfigError::InvertedRange("filters price"));
    }

    let square_footage = ValueRange::new(section.min_square_footage, section.max_square_footage);
    if !square_footage.is_ordered() {
        return Err(ConfigError::InvertedRange("filters square footage"));
    }

    let limit = section.limit.unwrap_or(DEFAULT_LISTING_LIMIT);
    if limit == 0 {
        return Err(ConfigError::InvalidValue {
            field: "filters.limit",
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(SearchFilters {
        price,
        square_footage,
        property_types: property_types(section.property_types)?,
        status: non_empty(section.status).unwrap_or_else(|| "Active".to_string()),
        limit,
    })
}

fn cost_parameters(
    costs: &CostSection,
    decision: &DecisionSection,
) -> Result<CostParameters, ConfigError> {
    let build_up_cost_per_sqft = costs.build_up_cost_per_sqft.unwrap_or(75.0);
    if !build_up_cost_per_sqft.is_finite() || build_up_cost_per_sqft < 0.0 {
        return Err(ConfigError::InvalidValue {
            field: "costs.build_up_cost_per_sqft",
            reason: "must be a non-negative amount".to_string(),
        });
    }

    let financing_rate = costs.financing_rate.unwrap_or(0.12);
    if !(0.0..1.0).contains(&financing_rate) {
        return Err(ConfigError::InvalidFinancingRate(financing_rate));
    }

    let decision_threshold = decision.threshold.unwrap_or(30_000.0);
    if !decision_threshold.is_finite() {
        return Err(ConfigError::InvalidValue {
            field: "decision.threshold",
            reason: "must be a finite amount".to_string(),
        });
    }

    Ok(CostParameters {
        build_up_cost_per_sqft,
        financing_rate,
        decision_threshold,
    })
}

fn delivery_config(section: DeliverySection) -> Result<DeliveryConfig, ConfigError> {
    let sender_email =
        non_empty(section.sender_email).ok_or(ConfigError::MissingValue("delivery.sender_email"))?;
    let recipients = section.recipients.into_vec();
    if recipients.is_empty() {
        return Err(ConfigError::NoRecipients);
    }
    if let Some(bad) = std::iter::once(&sender_email)
        .chain(&recipients)
        .find(|address| !looks_like_email(address))
    {
        return Err(ConfigError::InvalidEmail(bad.clone()));
    }

    Ok(DeliveryConfig {
        api_key: non_empty(section.api_key),
        sender_email,
        sender_name: non_empty(section.sender_name)
            .unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()),
        recipients,
        subject: non_empty(section.subject).unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
    })
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}
