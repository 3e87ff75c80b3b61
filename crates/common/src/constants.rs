use std::time::Duration;

pub const TARGETING_UPR_ID: &str = "upr_id";
pub const TARGETING_UPR_MAIN: &str = "upr_main";
pub const TARGETING_UPR_MODEL: &str = "upr_model";
pub const TARGETING_UPR_BROWSER: &str = "upr_browser";

/// Value written for `upr_browser` when the price rule document carries no browser.
pub const BROWSER_NONE: &str = "None";

/// Key sent to the price rule endpoint to tell it what the `adUnitPaths` are.
pub const REQUEST_KEY_AD_UNIT_PATH: &str = "adUnitPath";

/// Total number of attempts made against the price rule endpoint.
pub const REMOTE_CONFIG_MAX_ATTEMPTS: u32 = 3;
/// Numerator of the backoff between attempts, divided by the attempts left.
pub const REMOTE_CONFIG_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Bids below this CPM are treated as noise.
pub const MIN_VALID_CPM: f64 = 0.10;
/// Bids at or above this CPM are treated as data errors.
pub const MAX_VALID_CPM: f64 = 30.0;
