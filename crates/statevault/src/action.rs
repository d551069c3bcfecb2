//! Actions dispatched through the pipeline
//!
//! The synchronizer only inspects an action's kind: lifecycle actions
//! (store initialization and full state replacement) trigger hydration,
//! everything else flows straight through to the continuation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Action kind emitted by the host dispatcher when the store initializes.
pub const INIT_KIND: &str = "@@INIT";

/// Action kind emitted when the state tree is replaced, e.g. when a feature
/// module registers its fragments after startup.
pub const UPDATE_KIND: &str = "@@UPDATE_STATE";

/// An action flowing through the dispatch pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Discriminating kind, e.g. `"INCREMENT"`
    pub kind: String,
    /// Optional payload carried to the reducers
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    /// Create an action with no payload
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
        }
    }

    /// Attach a payload
    #[inline]
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// The store-initialization action
    #[inline]
    #[must_use]
    pub fn init() -> Self {
        Self::new(INIT_KIND)
    }

    /// The state-replacement action
    #[inline]
    #[must_use]
    pub fn update() -> Self {
        Self::new(UPDATE_KIND)
    }
}

/// Predicate distinguishing lifecycle actions from ordinary ones
///
/// Supplied by the host dispatch system; [`default_lifecycle_matcher`]
/// recognizes the standard init/replace pair.
pub type LifecycleMatcher = Arc<dyn Fn(&Action) -> bool + Send + Sync>;

/// Matcher recognizing [`INIT_KIND`] and [`UPDATE_KIND`]
#[must_use]
pub fn default_lifecycle_matcher() -> LifecycleMatcher {
    Arc::new(|action: &Action| action.kind == INIT_KIND || action.kind == UPDATE_KIND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_matcher_recognizes_lifecycle_kinds() {
        let matches = default_lifecycle_matcher();
        assert!(matches.as_ref()(&Action::init()));
        assert!(matches.as_ref()(&Action::update()));
        assert!(!matches.as_ref()(&Action::new("INCREMENT")));
    }

    #[test]
    fn action_payload_round_trip() {
        let action = Action::new("SET_USER").with_payload(json!({"id": 7}));
        let encoded = serde_json::to_string(&action).unwrap();
        let decoded: Action = serde_json::from_str(&encoded).unwrap();
        assert_eq!(action, decoded);
    }

    #[test]
    fn payload_defaults_to_null() {
        let decoded: Action = serde_json::from_str(r#"{"kind":"PING"}"#).unwrap();
        assert_eq!(decoded.payload, Value::Null);
    }
}
