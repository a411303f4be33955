//! Resolution of the property used as a feature's weight.
//!
//! The key is picked from the first feature that offers any numeric
//! property and then held for the rest of the pass. Features that lack the
//! chosen key simply have no weight.

use heat_map_sampling_models::WEIGHT_KEY_CANDIDATES;
use serde_json::{Map, Value};

use crate::coords::{parse_finite, parse_number};

/// Picks the weight key for a set of properties.
///
/// In priority order: the caller's preferred key, the first of
/// [`WEIGHT_KEY_CANDIDATES`], then the first property in document order.
/// Each must hold a finite numeric value to qualify.
#[must_use]
pub fn pick_weight_key(properties: &Map<String, Value>, preferred: Option<&str>) -> Option<String> {
    let is_numeric = |key: &str| properties.get(key).and_then(parse_finite).is_some();

    if let Some(key) = preferred.filter(|k| is_numeric(k)) {
        return Some(key.to_string());
    }

    if let Some(key) = WEIGHT_KEY_CANDIDATES.iter().find(|k| is_numeric(k)) {
        return Some((*key).to_string());
    }

    properties
        .iter()
        .find(|(_, v)| parse_finite(v).is_some())
        .map(|(k, _)| k.clone())
}

/// Holds the weight key for the duration of one pass.
#[derive(Debug, Clone, Default)]
pub struct WeightSelector {
    preferred: Option<String>,
    key: Option<String>,
}

impl WeightSelector {
    /// Creates a selector that favors `preferred` when it is numeric.
    #[must_use]
    pub fn new(preferred: Option<String>) -> Self {
        Self {
            preferred: preferred.filter(|k| !k.is_empty()),
            key: None,
        }
    }

    /// Resolves the key against `properties` if none has been found yet.
    ///
    /// Once a key is resolved it never changes.
    pub fn observe(&mut self, properties: &Map<String, Value>) {
        if self.key.is_none() {
            self.key = pick_weight_key(properties, self.preferred.as_deref());
            if let Some(key) = &self.key {
                log::debug!("Resolved weight key {key:?}");
            }
        }
    }

    /// The resolved key, if any.
    #[cfg(test)]
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Reads the weight of a feature under the resolved key.
    ///
    /// The value may be non-finite; `None` means the key is unresolved,
    /// missing from this feature, or not numeric.
    #[must_use]
    pub fn weight_of(&self, properties: &Map<String, Value>) -> Option<f64> {
        properties.get(self.key.as_deref()?).and_then(parse_number)
    }

    /// Consumes the selector, returning the resolved key.
    #[must_use]
    pub fn into_key(self) -> Option<String> {
        self.key
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn prefers_callers_key() {
        let p = props(json!({"population": 10, "area": 3.5}));
        assert_eq!(pick_weight_key(&p, Some("area")).as_deref(), Some("area"));
    }

    #[test]
    fn ignores_non_numeric_preferred_key() {
        let p = props(json!({"name": "Vilnius", "pop": "42"}));
        assert_eq!(pick_weight_key(&p, Some("name")).as_deref(), Some("pop"));
        assert_eq!(pick_weight_key(&p, Some("missing")).as_deref(), Some("pop"));
    }

    #[test]
    fn follows_candidate_order() {
        let p = props(json!({"count": 1, "density": 2, "value": 3}));
        assert_eq!(pick_weight_key(&p, None).as_deref(), Some("density"));
    }

    #[test]
    fn falls_back_to_first_numeric_in_document_order() {
        let p = props(json!({"name": "x", "zeta": "7.5", "alpha": 1}));
        assert_eq!(pick_weight_key(&p, None).as_deref(), Some("zeta"));
    }

    #[test]
    fn skips_non_finite_values() {
        let p = props(json!({"population": "NaN", "other": "inf", "ok": 3}));
        assert_eq!(pick_weight_key(&p, None).as_deref(), Some("ok"));
    }

    #[test]
    fn no_numeric_property_yields_none() {
        let p = props(json!({"name": "x", "flag": true, "nested": {"a": 1}}));
        assert_eq!(pick_weight_key(&p, None), None);
        assert_eq!(pick_weight_key(&Map::new(), Some("pop")), None);
    }

    #[test]
    fn selector_holds_first_resolved_key() {
        let mut selector = WeightSelector::new(None);
        selector.observe(&props(json!({"pop": 5})));
        selector.observe(&props(json!({"population": 6})));
        assert_eq!(selector.key(), Some("pop"));

        // A later feature lacking the key has no weight.
        assert_eq!(selector.weight_of(&props(json!({"population": 6}))), None);
        assert_eq!(selector.weight_of(&props(json!({"pop": "7"}))), Some(7.0));
    }

    #[test]
    fn selector_keeps_trying_until_a_key_is_found() {
        let mut selector = WeightSelector::new(Some(String::new()));
        selector.observe(&props(json!({"name": "x"})));
        assert_eq!(selector.key(), None);
        assert_eq!(selector.weight_of(&props(json!({"name": "x"}))), None);

        selector.observe(&props(json!({"value": 2})));
        assert_eq!(selector.into_key().as_deref(), Some("value"));
    }
}
