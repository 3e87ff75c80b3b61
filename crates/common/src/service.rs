//! Yield optimization service.
//!
//! Owns the provider selection and a single cached price rule future. Every
//! lookup made while the `dynamic` provider is still loading awaits the same
//! shared future, so a page with many ad slots issues one request per
//! [`YieldOptimizationService::init`] call.

use std::sync::{Arc, Mutex, PoisonError};

use error_stack::Report;
use futures::future::{self, BoxFuture, Shared};
use futures::FutureExt;

use crate::ad_unit_path::resolve_ad_unit_path;
use crate::constants::{
    BROWSER_NONE, TARGETING_UPR_BROWSER, TARGETING_UPR_ID, TARGETING_UPR_MAIN,
    TARGETING_UPR_MODEL,
};
use crate::error::YieldError;
use crate::remote_config::{load_price_rules, HttpFetch};
use crate::settings::{DynamicConfig, YieldOptimizationConfig};
use crate::slot::{AdSlot, AuctionHistory, TargetingSink};
use crate::types::{
    AdServer, AdUnitPathVariables, Device, Environment, PriceRule, PriceRuleModel,
    PriceRulesResponse,
};

type RulesResult = Result<Arc<PriceRulesResponse>, YieldError>;
type SharedRules = Shared<BoxFuture<'static, RulesResult>>;

fn settled(result: RulesResult) -> SharedRules {
    future::ready(result).boxed().shared()
}

struct CacheState {
    device: Option<Device>,
    ad_unit_path_variables: Arc<AdUnitPathVariables>,
    rules: SharedRules,
}

impl Default for CacheState {
    fn default() -> Self {
        Self {
            device: None,
            ad_unit_path_variables: Arc::new(AdUnitPathVariables::new()),
            rules: settled(Ok(Arc::new(PriceRulesResponse::empty()))),
        }
    }
}

/// Resolves unified pricing rules and writes them as ad slot targeting.
pub struct YieldOptimizationService {
    config: YieldOptimizationConfig,
    state: Mutex<CacheState>,
}

impl YieldOptimizationService {
    /// Create a service for the given provider configuration.
    ///
    /// Until [`init`](Self::init) is called every lookup sees an empty rule set.
    #[must_use]
    pub fn new(config: YieldOptimizationConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &YieldOptimizationConfig {
        &self.config
    }

    /// Whether a provider other than `none` is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Device captured by the last [`init`](Self::init) call.
    #[must_use]
    pub fn device(&self) -> Option<Device> {
        self.lock_state().device
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> (Arc<AdUnitPathVariables>, SharedRules) {
        let state = self.lock_state();
        (
            Arc::clone(&state.ad_unit_path_variables),
            state.rules.clone(),
        )
    }

    /// Select the price rule source for this page (or navigation).
    ///
    /// Replaces the cached rules, device and variables of any previous call.
    /// Lookups that already hold the previous rules keep resolving against
    /// them. For the `dynamic` provider the remote fetch is stored as a shared
    /// future before this returns; inside a tokio runtime it is also started
    /// right away. Loading failures settle to an empty rule set.
    pub fn init(
        &self,
        device: Device,
        ad_unit_path_variables: AdUnitPathVariables,
        ad_unit_paths: &[String],
        fetcher: Arc<dyn HttpFetch>,
    ) {
        let variables = Arc::new(ad_unit_path_variables);

        let rules = match &self.config {
            YieldOptimizationConfig::None => {
                log::warn!("Yield optimization is disabled");
                settled(Ok(Arc::new(PriceRulesResponse::empty())))
            }
            YieldOptimizationConfig::Static(config) => {
                log::debug!("Using {} static price rules", config.config.rules.len());
                settled(Ok(Arc::new(config.config.clone())))
            }
            YieldOptimizationConfig::Dynamic(config) => {
                let rules =
                    Self::load_remote_rules(config, device, &variables, ad_unit_paths, fetcher);
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(rules.clone().map(drop));
                }
                rules
            }
            YieldOptimizationConfig::Unknown => {
                log::error!("Unknown yield optimization config provider");
                settled(Err(YieldError::UnknownProvider))
            }
        };

        *self.lock_state() = CacheState {
            device: Some(device),
            ad_unit_path_variables: variables,
            rules,
        };
    }

    fn load_remote_rules(
        config: &DynamicConfig,
        device: Device,
        variables: &AdUnitPathVariables,
        ad_unit_paths: &[String],
        fetcher: Arc<dyn HttpFetch>,
    ) -> SharedRules {
        let paths: Vec<String> = ad_unit_paths
            .iter()
            .filter(|path| !config.excluded_ad_unit_paths.contains(path))
            .map(|path| resolve_ad_unit_path(path, variables))
            .collect();
        let endpoint = config.config_endpoint.clone();

        async move {
            match load_price_rules(fetcher.as_ref(), &endpoint, device, &paths).await {
                Ok(response) => {
                    log::info!(
                        "Loaded {} price rules for {} ad unit paths (device {})",
                        response.rules.len(),
                        paths.len(),
                        device
                    );
                    Ok(Arc::new(response))
                }
                Err(report) => {
                    log::error!(
                        "Failed to load price rules from {} for device {}, continuing without: {:?}",
                        endpoint,
                        device,
                        report
                    );
                    Ok(Arc::new(PriceRulesResponse::empty()))
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn rules(rules: SharedRules) -> Result<Arc<PriceRulesResponse>, Report<YieldError>> {
        rules.await.map_err(Report::new)
    }

    /// Look up the rule for `ad_unit_path`, resolved against the `init` variables.
    ///
    /// # Errors
    ///
    /// Fails only when the configured provider is unknown.
    pub async fn get_price_rule(
        &self,
        ad_unit_path: &str,
    ) -> Result<Option<PriceRule>, Report<YieldError>> {
        let (variables, rules) = self.snapshot();
        let path = resolve_ad_unit_path(ad_unit_path, &variables);
        let response = Self::rules(rules).await?;
        Ok(response.rules.get(&path).cloned())
    }

    /// Browser reported by the price rule document, or `"None"`.
    ///
    /// # Errors
    ///
    /// Fails only when the configured provider is unknown.
    pub async fn get_browser(&self) -> Result<String, Report<YieldError>> {
        let (_, rules) = self.snapshot();
        let response = Self::rules(rules).await?;
        Ok(response
            .browser
            .clone()
            .unwrap_or_else(|| BROWSER_NONE.to_string()))
    }

    /// Write `upr_*` targeting for `ad_slot` and return the rule used.
    ///
    /// Targeting is only written for GAM; other ad servers still get the rule
    /// back. For a main-cohort rule, a `dynamic` config with floor prices and
    /// previous winning CPMs for the slot replace the rule id with a computed
    /// floor.
    ///
    /// # Errors
    ///
    /// Fails only when the configured provider is unknown.
    pub async fn set_targeting(
        &self,
        ad_slot: &mut dyn AdSlot,
        ad_server: AdServer,
        yield_config: &YieldOptimizationConfig,
        auction_history: Option<&dyn AuctionHistory>,
    ) -> Result<Option<PriceRule>, Report<YieldError>> {
        let (variables, rules) = self.snapshot();
        let ad_unit_path = resolve_ad_unit_path(&ad_slot.ad_unit_path(), &variables);
        let response = Self::rules(rules).await?;
        let rule = response.rules.get(&ad_unit_path).cloned();

        if ad_server != AdServer::Gam {
            return Ok(rule);
        }

        let Some(rule) = rule else {
            if self.is_enabled() {
                log::warn!("No price rule found for ad unit path {}", ad_unit_path);
            }
            return Ok(None);
        };

        let model = rule.model.clone().unwrap_or(PriceRuleModel::Static);
        ad_slot.set_targeting(TARGETING_UPR_MODEL, &model.to_string());

        if !rule.main {
            ad_slot.set_targeting(TARGETING_UPR_ID, &rule.price_rule_id.to_string());
            return Ok(Some(rule));
        }

        ad_slot.set_targeting(TARGETING_UPR_MAIN, "true");

        let dynamic_rule = auction_history
            .zip(yield_config.dynamic_floor_prices())
            .and_then(|(history, floor_prices)| {
                history
                    .last_bid_cpms_of_ad_unit(&ad_slot.slot_element_id())
                    .filter(|cpms| !cpms.is_empty())
                    .map(|cpms| floor_prices.apply(&cpms, &rule))
            });

        let rule = match dynamic_rule {
            Some(dynamic_rule) => {
                log::debug!(
                    "Dynamic price rule {} replaces {} for {}",
                    dynamic_rule.price_rule_id,
                    rule.price_rule_id,
                    ad_unit_path
                );
                dynamic_rule
            }
            None => rule,
        };
        ad_slot.set_targeting(TARGETING_UPR_ID, &rule.price_rule_id.to_string());

        Ok(Some(rule))
    }

    /// Write the page-level `upr_browser` key for GAM in production.
    ///
    /// # Errors
    ///
    /// Fails only when the configured provider is unknown.
    pub async fn set_page_targeting(
        &self,
        page: &mut dyn TargetingSink,
        ad_server: AdServer,
        environment: Environment,
    ) -> Result<(), Report<YieldError>> {
        if ad_server != AdServer::Gam || environment != Environment::Production {
            return Ok(());
        }

        let browser = self.get_browser().await?;
        page.set_targeting(TARGETING_UPR_BROWSER, &browser);
        Ok(())
    }
}
