//! Floor price calculation command.

use serde_json::json;

use unified_pricing_common::floor_price::DynamicFloorPrices;
use unified_pricing_common::types::PriceRule;

use crate::error::CliError;

/// Compute the rule a main-cohort slot would get for the given previous CPMs.
#[must_use]
pub fn calculate(
    floor_prices: &DynamicFloorPrices,
    cpms: &[f64],
    standard_rule: &PriceRule,
) -> PriceRule {
    floor_prices.apply(cpms, standard_rule)
}

/// Print the result of [`calculate`] as JSON.
pub fn print(
    floor_prices: &DynamicFloorPrices,
    cpms: &[f64],
    standard_rule: &PriceRule,
    verbose: bool,
) -> Result<(), CliError> {
    if floor_prices.rounding_steps_in_cents == 0 {
        return Err(CliError::Config(
            "--rounding-steps must be at least 1".to_string(),
        ));
    }

    let rule = calculate(floor_prices, cpms, standard_rule);
    if verbose {
        println!("Previous CPMs: {:?}", cpms);
    }

    let output = json!({
        "strategy": floor_prices.strategy.to_string(),
        "overridden": &rule != standard_rule,
        "rule": rule,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
