//! Ad unit path variable resolution.
//!
//! Publisher configs describe ad unit paths as templates such as
//! `/55155651/{domain}/{device}/sidebar`. Both the outbound price rule request
//! and the per-slot rule lookup resolve paths against the same variable set,
//! so rules can be keyed by either the template or the concrete path.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::types::AdUnitPathVariables;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^{}]+)\}").expect("placeholder regex should compile")
});

/// Replace every `{key}` in `path` with the matching variable.
///
/// Placeholders without a matching variable are left untouched.
#[must_use]
pub fn resolve_ad_unit_path(path: &str, variables: &AdUnitPathVariables) -> String {
    if variables.is_empty() {
        return path.to_string();
    }

    PLACEHOLDER_RE
        .replace_all(path, |caps: &Captures<'_>| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables(pairs: &[(&str, &str)]) -> AdUnitPathVariables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolves_all_known_variables() {
        let vars = variables(&[("device", "mobile"), ("domain", "example.com")]);
        assert_eq!(
            resolve_ad_unit_path("/1234/{domain}/{device}/ad_content_1", &vars),
            "/1234/example.com/mobile/ad_content_1"
        );
    }

    #[test]
    fn test_replaces_repeated_placeholders() {
        let vars = variables(&[("device", "desktop")]);
        assert_eq!(
            resolve_ad_unit_path("/{device}/x/{device}", &vars),
            "/desktop/x/desktop"
        );
    }

    #[test]
    fn test_keeps_unknown_placeholders() {
        let vars = variables(&[("device", "mobile")]);
        assert_eq!(
            resolve_ad_unit_path("/1234/{domain}/{device}", &vars),
            "/1234/{domain}/mobile"
        );
    }

    #[test]
    fn test_without_variables_returns_input() {
        assert_eq!(
            resolve_ad_unit_path("/1234/{domain}", &AdUnitPathVariables::new()),
            "/1234/{domain}"
        );
        assert_eq!(resolve_ad_unit_path("", &AdUnitPathVariables::new()), "");
    }

    #[test]
    fn test_resolving_twice_is_idempotent() {
        let vars = variables(&[("device", "mobile"), ("domain", "example.com")]);
        let template = "/1234/{domain}/{device}/{category}";
        let once = resolve_ad_unit_path(template, &vars);
        assert_eq!(resolve_ad_unit_path(&once, &vars), once);
    }

    #[test]
    fn test_concrete_paths_pass_through() {
        let vars = variables(&[("device", "mobile")]);
        assert_eq!(
            resolve_ad_unit_path("/1234/example.com/mobile/ad", &vars),
            "/1234/example.com/mobile/ad"
        );
    }
}
