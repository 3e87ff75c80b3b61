//! Module configuration for the yield optimization engine.
//!
//! Settings are read from TOML (or JSON) and may be overridden with
//! environment variables prefixed with `UPR__`, e.g.
//! `UPR__YIELD_OPTIMIZATION__CONFIG_ENDPOINT=https://floor.example.com/prices`.

use config::{Config, Environment as EnvSource, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::error::YieldError;
use crate::floor_price::DynamicFloorPrices;
use crate::types::{AdServer, Environment, PriceRulesResponse};

pub const ENVIRONMENT_PREFIX: &str = "UPR";
pub const ENVIRONMENT_SEPARATOR: &str = "__";

/// Inline price rules of the `static` provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticConfig {
    pub config: PriceRulesResponse,
}

/// Remote price rules of the `dynamic` provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DynamicConfig {
    /// Endpoint answering price rule requests.
    #[serde(alias = "configEndpoint")]
    #[validate(url)]
    pub config_endpoint: String,

    /// Ad unit paths (unresolved) never sent to the endpoint.
    #[serde(default, alias = "excludedAdUnitPaths")]
    pub excluded_ad_unit_paths: Vec<String>,

    /// Optional override of main-cohort rules from previous bids.
    #[serde(default, alias = "dynamicFloorPrices")]
    #[validate(nested)]
    pub dynamic_floor_prices: Option<DynamicFloorPrices>,
}

/// Where price rules come from, selected by the `provider` tag.
///
/// A tag other than `none`, `static` or `dynamic` deserializes to
/// [`YieldOptimizationConfig::Unknown`]; the service then fails every lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum YieldOptimizationConfig {
    None,
    Static(StaticConfig),
    Dynamic(DynamicConfig),
    #[serde(other)]
    Unknown,
}

impl YieldOptimizationConfig {
    /// Provider tag as written in the configuration.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Static(_) => "static",
            Self::Dynamic(_) => "dynamic",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Dynamic floor price settings, if this is a `dynamic` config with them.
    #[must_use]
    pub fn dynamic_floor_prices(&self) -> Option<&DynamicFloorPrices> {
        match self {
            Self::Dynamic(config) => config.dynamic_floor_prices.as_ref(),
            _ => None,
        }
    }
}

impl Validate for YieldOptimizationConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::Dynamic(config) => config.validate(),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub ad_server: AdServer,
    pub yield_optimization: YieldOptimizationConfig,
}

impl Settings {
    /// Parse settings from TOML, applying `UPR__` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TOML is invalid, required fields
    /// are missing, or validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<YieldError>> {
        Self::from_source(toml_str, FileFormat::Toml)
    }

    /// Parse settings from a JSON module config, applying `UPR__` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the JSON is invalid, required fields
    /// are missing, or validation fails.
    pub fn from_json(json_str: &str) -> Result<Self, Report<YieldError>> {
        Self::from_source(json_str, FileFormat::Json)
    }

    fn from_source(source: &str, format: FileFormat) -> Result<Self, Report<YieldError>> {
        let environment = EnvSource::default()
            .prefix(ENVIRONMENT_PREFIX)
            .separator(ENVIRONMENT_SEPARATOR);

        let settings: Self = Config::builder()
            .add_source(File::from_str(source, format))
            .add_source(environment)
            .build()
            .change_context(YieldError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?
            .try_deserialize()
            .change_context(YieldError::Configuration {
                message: "Failed to deserialize configuration".to_string(),
            })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the provider configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the invalid fields.
    pub fn validate(&self) -> Result<(), Report<YieldError>> {
        self.yield_optimization
            .validate()
            .change_context(YieldError::Configuration {
                message: "Settings validation failed".to_string(),
            })
    }

    /// Serialize the effective settings as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if serialization fails.
    pub fn to_canonical_json(&self) -> Result<String, Report<YieldError>> {
        serde_json::to_string_pretty(self).change_context(YieldError::Configuration {
            message: "Failed to serialize settings".to_string(),
        })
    }
}
