//! Dynamic floor prices derived from previous winning bids.
//!
//! The main-cohort price rule of a slot can be replaced by a floor computed
//! from the CPMs that recently won on the same slot. The resulting rule uses
//! the rounded cents value as its `priceRuleId`, so the ad server can map the
//! key-value straight to a price without an id lookup table.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{MAX_VALID_CPM, MIN_VALID_CPM};
use crate::types::PriceRule;

/// How the floor is picked from the valid previous CPMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "kebab-case")]
pub enum FloorPriceStrategy {
    #[display("max")]
    Max,
    #[display("min")]
    Min,
    #[display("second-highest")]
    SecondHighest,
}

impl std::str::FromStr for FloorPriceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "second-highest" => Ok(Self::SecondHighest),
            other => Err(format!("unknown floor price strategy '{}'", other)),
        }
    }
}

/// Dynamic floor price settings of the `dynamic` provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DynamicFloorPrices {
    pub strategy: FloorPriceStrategy,

    /// Computed floors are rounded down to a multiple of this step.
    #[serde(alias = "roundingStepsInCents")]
    #[validate(range(min = 1))]
    pub rounding_steps_in_cents: u32,

    /// Upper bound applied after rounding.
    #[serde(default, alias = "maxPriceRuleInCents")]
    #[validate(range(min = 1))]
    pub max_price_rule_in_cents: Option<u32>,

    /// Accepted for configuration compatibility. Not applied to computed floors.
    #[serde(default, alias = "minPriceRuleInCents")]
    #[validate(range(min = 1))]
    pub min_price_rule_in_cents: Option<u32>,
}

impl DynamicFloorPrices {
    /// Compute the overriding rule for `standard_rule` from `previous_cpms`.
    #[must_use]
    pub fn apply(&self, previous_cpms: &[f64], standard_rule: &PriceRule) -> PriceRule {
        calculate_dynamic_price_rule(
            Some(self.strategy),
            previous_cpms,
            standard_rule,
            self.rounding_steps_in_cents,
            self.max_price_rule_in_cents,
        )
    }
}

fn is_valid_cpm(cpm: f64) -> bool {
    !cpm.is_nan() && cpm >= MIN_VALID_CPM && cpm < MAX_VALID_CPM
}

fn to_cents(cpm: f64) -> u64 {
    // valid CPMs are bounded, so the cast cannot truncate
    (cpm * 100.0).round() as u64
}

/// Compute a price rule from previous bid CPMs.
///
/// CPMs below 0.10 or at/above 30 (and NaN) are ignored. Without a strategy
/// or without any valid CPM, `standard_rule` is returned unchanged.
///
/// The returned rule keeps the `floorprice` of the picked CPM and uses the
/// cents value, rounded down to `rounding_steps_in_cents` and capped at
/// `max_price_rule_in_cents`, as its `priceRuleId`.
#[must_use]
pub fn calculate_dynamic_price_rule(
    strategy: Option<FloorPriceStrategy>,
    previous_cpms: &[f64],
    standard_rule: &PriceRule,
    rounding_steps_in_cents: u32,
    max_price_rule_in_cents: Option<u32>,
) -> PriceRule {
    let mut valid: Vec<f64> = previous_cpms
        .iter()
        .copied()
        .filter(|cpm| is_valid_cpm(*cpm))
        .collect();

    let strategy = match strategy {
        Some(strategy) if !valid.is_empty() => strategy,
        _ => return standard_rule.clone(),
    };

    let picked = match strategy {
        FloorPriceStrategy::Max => valid.iter().copied().fold(f64::MIN, f64::max),
        FloorPriceStrategy::Min => valid.iter().copied().fold(f64::MAX, f64::min),
        FloorPriceStrategy::SecondHighest => {
            valid.sort_by(f64::total_cmp);
            // a single valid CPM is its own second highest
            valid[valid.len().saturating_sub(2)]
        }
    };

    let cents = to_cents(picked);
    if cents == 0 {
        return standard_rule.clone();
    }

    let step = u64::from(rounding_steps_in_cents.max(1));
    let mut rounded = cents / step * step;
    if let Some(max) = max_price_rule_in_cents.map(u64::from) {
        if rounded > max {
            rounded = max;
        }
    }

    log::debug!(
        "Dynamic floor price ({}): picked {} from {} valid cpms, rule id {}",
        strategy,
        picked,
        valid.len(),
        rounded
    );

    PriceRule {
        price_rule_id: rounded,
        floorprice: cents as f64 / 100.0,
        ..standard_rule.clone()
    }
}
