//! Settings file commands.
//!
//! Settings are loaded from TOML (or JSON, by file extension) and merged with
//! environment variables prefixed with `UPR__`. For example,
//! `UPR__YIELD_OPTIMIZATION__CONFIG_ENDPOINT` overrides
//! `yield_optimization.config_endpoint`.

use std::fs;
use std::path::Path;

use unified_pricing_common::settings::{Settings, YieldOptimizationConfig};

use crate::error::CliError;

/// Load settings from `file`, merged with `UPR__` environment variables and validated.
pub(crate) fn load_settings(file: &Path, verbose: bool) -> Result<Settings, CliError> {
    let content = fs::read_to_string(file)?;

    if verbose {
        println!("Loading config from: {}", file.display());
        println!("Environment variables with UPR__ prefix will be merged");
    }

    let is_json = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let settings = if is_json {
        Settings::from_json(&content)
    } else {
        Settings::from_toml(&content)
    };

    settings.map_err(|e| CliError::Config(format!("Failed to load settings: {:?}", e)))
}

/// One-line description of the configured provider.
pub(crate) fn describe_provider(config: &YieldOptimizationConfig) -> String {
    match config {
        YieldOptimizationConfig::None => "none (yield optimization disabled)".to_string(),
        YieldOptimizationConfig::Static(config) => {
            format!("static ({} inline rules)", config.config.rules.len())
        }
        YieldOptimizationConfig::Dynamic(config) => {
            let floor_prices = config
                .dynamic_floor_prices
                .as_ref()
                .map_or("off".to_string(), |fp| {
                    format!("{} / {} cents", fp.strategy, fp.rounding_steps_in_cents)
                });
            format!(
                "dynamic (endpoint {}, {} excluded paths, dynamic floors {})",
                config.config_endpoint,
                config.excluded_ad_unit_paths.len(),
                floor_prices
            )
        }
        YieldOptimizationConfig::Unknown => "unknown (every lookup will fail)".to_string(),
    }
}

/// Validate a settings file.
pub fn validate(file: &Path, verbose: bool) -> Result<(), CliError> {
    let settings = load_settings(file, verbose)?;

    if matches!(settings.yield_optimization, YieldOptimizationConfig::Unknown) {
        return Err(CliError::Config(
            "Unknown yield optimization provider".to_string(),
        ));
    }

    println!("Configuration is valid");
    println!("  File: {}", file.display());
    println!("  Environment: {:?}", settings.environment);
    println!("  Ad server: {:?}", settings.ad_server);
    println!(
        "  Provider: {}",
        describe_provider(&settings.yield_optimization)
    );

    if verbose {
        let canonical = settings
            .to_canonical_json()
            .map_err(|e| CliError::Config(format!("{:?}", e)))?;
        println!("\nEffective configuration:");
        println!("{}", canonical);
    }

    Ok(())
}
