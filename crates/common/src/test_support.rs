#[cfg(test)]
pub mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use error_stack::Report;
    use http::{HeaderMap, Request, Response, StatusCode};

    use crate::error::YieldError;
    use crate::remote_config::{HttpFetch, RequestMode};
    use crate::settings::Settings;
    use crate::slot::{AdSlot, AuctionHistory, TargetingSink};
    use crate::types::{AdUnitPathVariables, PriceRule};

    pub fn crate_test_settings_str() -> String {
        r#"
            environment = "production"
            ad_server = "gam"

            [yield_optimization]
            provider = "dynamic"
            config_endpoint = "https://floor.example.com/prices"
            excluded_ad_unit_paths = ["/1234/{domain}/excluded"]

            [yield_optimization.dynamic_floor_prices]
            strategy = "max"
            rounding_steps_in_cents = 5
            max_price_rule_in_cents = 500
            "#
        .to_string()
    }

    pub fn create_test_settings() -> Settings {
        let toml_str = crate_test_settings_str();
        Settings::from_toml(&toml_str).expect("Invalid config")
    }

    pub fn test_variables() -> AdUnitPathVariables {
        [("domain", "example.com"), ("device", "mobile")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn main_rule(price_rule_id: u64, floorprice: f64) -> PriceRule {
        PriceRule {
            price_rule_id,
            floorprice,
            model: None,
            main: true,
        }
    }

    /// Scripted outcome of a single [`MockFetch`] call.
    #[derive(Debug, Clone)]
    pub enum MockOutcome {
        Respond { status: StatusCode, body: String },
        Fail(String),
    }

    impl MockOutcome {
        pub fn ok(body: &str) -> Self {
            Self::status(StatusCode::OK, body)
        }

        pub fn status(status: StatusCode, body: &str) -> Self {
            Self::Respond {
                status,
                body: body.to_string(),
            }
        }

        pub fn fail(message: &str) -> Self {
            Self::Fail(message.to_string())
        }
    }

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub uri: String,
        pub headers: HeaderMap,
        pub mode: Option<RequestMode>,
        pub body: serde_json::Value,
    }

    /// Fetcher replaying a queue of outcomes and recording every request.
    ///
    /// Once the queue is empty every call fails.
    pub struct MockFetch {
        outcomes: Mutex<VecDeque<MockOutcome>>,
        requests: Mutex<Vec<RecordedRequest>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl MockFetch {
        pub fn new(outcomes: Vec<MockOutcome>) -> Arc<Self> {
            Arc::new(Self::build(outcomes, None))
        }

        pub fn with_delay(outcomes: Vec<MockOutcome>, delay: Duration) -> Arc<Self> {
            Arc::new(Self::build(outcomes, Some(delay)))
        }

        fn build(outcomes: Vec<MockOutcome>, delay: Option<Duration>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                delay,
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl HttpFetch for MockFetch {
        async fn fetch(
            &self,
            request: Request<Vec<u8>>,
        ) -> Result<Response<Vec<u8>>, Report<YieldError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .expect("requests lock")
                .push(RecordedRequest {
                    uri: request.uri().to_string(),
                    headers: request.headers().clone(),
                    mode: request.extensions().get::<RequestMode>().copied(),
                    body: serde_json::from_slice(request.body())
                        .unwrap_or(serde_json::Value::Null),
                });

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let outcome = self.outcomes.lock().expect("outcomes lock").pop_front();
            match outcome {
                Some(MockOutcome::Respond { status, body }) => Ok(Response::builder()
                    .status(status)
                    .body(body.into_bytes())
                    .expect("valid mock response")),
                Some(MockOutcome::Fail(message)) => {
                    Err(Report::new(YieldError::Http { message }))
                }
                None => Err(Report::new(YieldError::Http {
                    message: "no scripted response".to_string(),
                })),
            }
        }
    }

    /// Ad slot recording the targeting written to it.
    #[derive(Debug, Default)]
    pub struct MockAdSlot {
        pub ad_unit_path: String,
        pub slot_element_id: String,
        pub targeting: HashMap<String, String>,
    }

    impl MockAdSlot {
        pub fn new(ad_unit_path: &str, slot_element_id: &str) -> Self {
            Self {
                ad_unit_path: ad_unit_path.to_string(),
                slot_element_id: slot_element_id.to_string(),
                targeting: HashMap::new(),
            }
        }

        pub fn targeting(&self, key: &str) -> Option<&str> {
            self.targeting.get(key).map(String::as_str)
        }
    }

    impl TargetingSink for MockAdSlot {
        fn set_targeting(&mut self, key: &str, value: &str) {
            self.targeting.insert(key.to_string(), value.to_string());
        }
    }

    impl AdSlot for MockAdSlot {
        fn ad_unit_path(&self) -> String {
            self.ad_unit_path.clone()
        }

        fn slot_element_id(&self) -> String {
            self.slot_element_id.clone()
        }
    }

    /// Page-level targeting recorder.
    #[derive(Debug, Default)]
    pub struct MockPageTargeting {
        pub targeting: HashMap<String, String>,
    }

    impl TargetingSink for MockPageTargeting {
        fn set_targeting(&mut self, key: &str, value: &str) {
            self.targeting.insert(key.to_string(), value.to_string());
        }
    }

    /// Auction history serving fixed CPMs per DOM id.
    #[derive(Debug, Default)]
    pub struct MockAuctionHistory {
        pub cpms: HashMap<String, Vec<f64>>,
    }

    impl MockAuctionHistory {
        pub fn with_cpms(dom_id: &str, cpms: &[f64]) -> Self {
            let mut history = Self::default();
            history.cpms.insert(dom_id.to_string(), cpms.to_vec());
            history
        }
    }

    impl AuctionHistory for MockAuctionHistory {
        fn last_bid_cpms_of_ad_unit(&self, dom_id: &str) -> Option<Vec<f64>> {
            self.cpms.get(dom_id).cloned()
        }
    }
}
