//! Remote price rule loading for the `dynamic` provider.
//!
//! The endpoint receives the device and the resolved ad unit paths of the page
//! and answers with a [`PriceRulesResponse`]. Transport failures, error
//! statuses, unparsable bodies and documents with a malformed rule are all
//! retried within a small budget, since the result gates ad rendering.

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, Response};
use serde::Serialize;
use serde_json::Value;

use crate::constants::{
    REMOTE_CONFIG_BACKOFF_BASE, REMOTE_CONFIG_MAX_ATTEMPTS, REQUEST_KEY_AD_UNIT_PATH,
};
use crate::error::YieldError;
use crate::types::{integral_price_rule_id, Device, PriceRulesResponse};

/// Fetch mode attached to outgoing requests as a request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Cors,
    SameOrigin,
}

/// Transport used to reach the price rule endpoint.
///
/// Implementations return `Err` only when no response was received at all;
/// error statuses are returned as regular responses.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<Response<Vec<u8>>, Report<YieldError>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriceRulesRequest<'a> {
    device: Device,
    key: &'static str,
    ad_unit_paths: &'a [String],
}

/// Build the POST request sent to the price rule endpoint.
///
/// # Errors
///
/// Returns a configuration error when `endpoint` is not a valid URI.
pub fn build_price_rules_request(
    endpoint: &str,
    device: Device,
    ad_unit_paths: &[String],
) -> Result<Request<Vec<u8>>, Report<YieldError>> {
    let body = serde_json::to_vec(&PriceRulesRequest {
        device,
        key: REQUEST_KEY_AD_UNIT_PATH,
        ad_unit_paths,
    })
    .change_context(YieldError::Configuration {
        message: "Failed to serialize price rules request".to_string(),
    })?;

    Request::builder()
        .method(Method::POST)
        .uri(endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
        .extension(RequestMode::Cors)
        .body(body)
        .change_context(YieldError::Configuration {
            message: format!("Invalid price rules endpoint: {}", endpoint),
        })
}

fn is_price_rule_id(value: &Value) -> bool {
    value.is_u64() || value.as_f64().and_then(integral_price_rule_id).is_some()
}

fn is_price_rule(value: &Value) -> bool {
    value.get("main").is_some_and(Value::is_boolean)
        && value.get("floorprice").is_some_and(Value::is_number)
        && value.get("priceRuleId").is_some_and(is_price_rule_id)
}

fn invalid_response(message: impl Into<String>) -> Report<YieldError> {
    Report::new(YieldError::InvalidResponse {
        message: message.into(),
    })
}

/// Parse and shape-check a price rule document.
///
/// A document with a single malformed rule is rejected as a whole.
///
/// # Errors
///
/// Returns an invalid response error when the body is not JSON, has no
/// `rules` object, or any rule lacks a boolean `main`, a numeric `floorprice`
/// or a non-negative integral `priceRuleId`. Unknown `model` tags are kept.
pub fn parse_price_rules(body: &[u8]) -> Result<PriceRulesResponse, Report<YieldError>> {
    let value: Value = serde_json::from_slice(body).change_context(YieldError::InvalidResponse {
        message: "Response body is not valid JSON".to_string(),
    })?;

    let rules = value
        .get("rules")
        .ok_or_else(|| invalid_response("Response is missing rules"))?
        .as_object()
        .ok_or_else(|| invalid_response("Response rules is not an object"))?;

    if let Some((key, _)) = rules.iter().find(|(_, rule)| !is_price_rule(rule)) {
        return Err(invalid_response(format!(
            "Response contains an invalid price rule for '{}'",
            key
        )));
    }

    serde_json::from_value(value).change_context(YieldError::InvalidResponse {
        message: "Response does not match the price rules format".to_string(),
    })
}

async fn fetch_price_rules(
    fetcher: &dyn HttpFetch,
    request: Request<Vec<u8>>,
) -> Result<PriceRulesResponse, Report<YieldError>> {
    let response = fetcher.fetch(request).await?;
    let status = response.status();

    if !status.is_success() {
        let text = String::from_utf8_lossy(response.body());
        let message = format!("{} {}", status.canonical_reason().unwrap_or_default(), text);
        return Err(Report::new(YieldError::Http {
            message: message.trim().to_string(),
        })
        .attach(format!("status {}", status.as_u16())));
    }

    parse_price_rules(response.body())
}

/// Load price rules with the default budget of three attempts.
///
/// # Errors
///
/// Returns the error of the last attempt once the budget is exhausted.
pub async fn load_price_rules(
    fetcher: &dyn HttpFetch,
    endpoint: &str,
    device: Device,
    ad_unit_paths: &[String],
) -> Result<PriceRulesResponse, Report<YieldError>> {
    load_price_rules_with_attempts(
        fetcher,
        endpoint,
        device,
        ad_unit_paths,
        REMOTE_CONFIG_MAX_ATTEMPTS,
    )
    .await
}

/// Load price rules, making at most `max_attempts` sequential requests.
///
/// Every failed attempt with `n` attempts left (counting the failed one) is
/// followed by a `100ms / n` wait, the last one included, so an exhausted
/// budget of three costs about 183ms of backoff.
///
/// # Errors
///
/// Returns the error of the last attempt once the budget is exhausted, or a
/// configuration error when the request cannot be built.
pub async fn load_price_rules_with_attempts(
    fetcher: &dyn HttpFetch,
    endpoint: &str,
    device: Device,
    ad_unit_paths: &[String],
    max_attempts: u32,
) -> Result<PriceRulesResponse, Report<YieldError>> {
    let max_attempts = max_attempts.max(1);
    let mut attempts_left = max_attempts;

    loop {
        let attempt = max_attempts - attempts_left + 1;
        let request = build_price_rules_request(endpoint, device, ad_unit_paths)?;

        match fetch_price_rules(fetcher, request).await {
            Ok(response) => {
                log::debug!(
                    "Loaded {} price rules for device {} (attempt {})",
                    response.rules.len(),
                    device,
                    attempt
                );
                return Ok(response);
            }
            Err(report) => {
                let backoff = REMOTE_CONFIG_BACKOFF_BASE / attempts_left;
                attempts_left -= 1;
                log::warn!(
                    "Price rules request failed for device {} (attempt {}, {} left), waiting {:?}: {}",
                    device,
                    attempt,
                    attempts_left,
                    backoff,
                    report
                );
                tokio::time::sleep(backoff).await;

                if attempts_left == 0 {
                    return Err(report.attach(format!(
                        "giving up after {} attempts for device {}",
                        attempt, device
                    )));
                }
            }
        }
    }
}
