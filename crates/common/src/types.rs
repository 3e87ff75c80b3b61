//! Core types for unified pricing rules.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Device class supplied by the label service.
///
/// Selects the price rule document variant and fills the `{device}` path variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[display("mobile")]
    Mobile,
    #[display("desktop")]
    Desktop,
}

impl std::str::FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(Device::Mobile),
            "desktop" => Ok(Device::Desktop),
            other => Err(format!("unknown device '{}'", other)),
        }
    }
}

/// Variables substituted into `{name}` placeholders of ad unit paths.
pub type AdUnitPathVariables = HashMap<String, String>;

/// How a price rule was produced.
///
/// Tags other than `static`, `ml` and `fixed` are kept verbatim in
/// [`PriceRuleModel::Other`] so they still reach `upr_model` targeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(from = "String", into = "String")]
pub enum PriceRuleModel {
    #[display("static")]
    Static,
    #[display("ml")]
    Ml,
    #[display("fixed")]
    Fixed,
    #[display("{_0}")]
    Other(String),
}

impl From<String> for PriceRuleModel {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "static" => Self::Static,
            "ml" => Self::Ml,
            "fixed" => Self::Fixed,
            _ => Self::Other(tag),
        }
    }
}

impl From<PriceRuleModel> for String {
    fn from(model: PriceRuleModel) -> Self {
        model.to_string()
    }
}

/// Whether `value` is usable as a `priceRuleId`: a non-negative integer,
/// possibly written with a zero fraction (`3.0`).
#[must_use]
pub fn integral_price_rule_id(value: f64) -> Option<u64> {
    // 2^64 itself is not representable as u64
    let in_range = value >= 0.0 && value < 18_446_744_073_709_551_616.0;
    (in_range && value.fract() == 0.0).then(|| value as u64)
}

fn deserialize_price_rule_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Integer(u64),
        Float(f64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Integer(id) => Ok(id),
        RawId::Float(id) => integral_price_rule_id(id).ok_or_else(|| {
            serde::de::Error::custom(format!("priceRuleId {} is not a non-negative integer", id))
        }),
    }
}

/// A floor price for one placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRule {
    /// Identifier of the unified pricing rule in the ad server.
    #[serde(rename = "priceRuleId", deserialize_with = "deserialize_price_rule_id")]
    pub price_rule_id: u64,
    /// Floor price in whole currency units (EUR).
    pub floorprice: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PriceRuleModel>,
    /// `true` for the rule applied to the main traffic share, `false` for a test cohort.
    pub main: bool,
}

/// Price rules keyed by ad unit path.
pub type PriceRules = HashMap<String, PriceRule>;

/// Price rule document, either inlined in the config or served by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRulesResponse {
    pub rules: PriceRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
}

impl PriceRulesResponse {
    /// An empty rule set, used when the engine is disabled or loading failed.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Ad server the targeting is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdServer {
    #[default]
    Gam,
    Prebidjs,
}

/// Deployment environment of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Test,
}
