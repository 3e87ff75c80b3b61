//! Price rule lookup command.

use std::path::Path;
use std::sync::Arc;

use error_stack::Report;
use serde_json::{json, Map, Value};

use unified_pricing_common::error::YieldError;
use unified_pricing_common::service::YieldOptimizationService;
use unified_pricing_common::types::{AdUnitPathVariables, Device};

use crate::config::{describe_provider, load_settings};
use crate::error::CliError;
use crate::fetch::UreqFetch;

/// Parse a `key=value` path variable.
pub fn parse_variable(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

async fn lookup(
    service: &YieldOptimizationService,
    paths: &[String],
) -> Result<(Map<String, Value>, String), Report<YieldError>> {
    let mut rules = Map::new();
    for path in paths {
        let rule = service.get_price_rule(path).await?;
        rules.insert(
            path.clone(),
            rule.map_or(Value::Null, |rule| json!(rule)),
        );
    }
    let browser = service.get_browser().await?;
    Ok((rules, browser))
}

/// Resolve the price rules the configured provider yields for `paths`.
pub fn fetch(
    file: &Path,
    device: Device,
    paths: Vec<String>,
    variables: Vec<(String, String)>,
    verbose: bool,
) -> Result<(), CliError> {
    let settings = load_settings(file, verbose)?;
    if verbose {
        println!(
            "Provider: {}",
            describe_provider(&settings.yield_optimization)
        );
    }

    let variables: AdUnitPathVariables = variables.into_iter().collect();
    let service = YieldOptimizationService::new(settings.yield_optimization);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let (rules, browser) = runtime
        .block_on(async {
            service.init(device, variables, &paths, Arc::new(UreqFetch::new()));
            lookup(&service, &paths).await
        })
        .map_err(|e| CliError::Rules(format!("{:?}", e)))?;

    let output = json!({
        "device": device,
        "provider": service.config().provider_name(),
        "browser": browser,
        "rules": rules,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
