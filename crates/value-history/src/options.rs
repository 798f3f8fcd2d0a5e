//! History configuration.

use serde::{Deserialize, Serialize};
use value_history_patch::DiffStrategy;

/// Options shared by every history created from the same configuration.
///
/// Missing fields take their defaults, so an empty table is a valid
/// configuration:
///
/// ```
/// use value_history::{DiffStrategy, HistoryOptions};
///
/// let options: HistoryOptions = serde_json::from_str(r#"{"strategy": "structural"}"#).unwrap();
/// assert_eq!(options.strategy, DiffStrategy::Structural);
/// assert_eq!(serde_json::from_str::<HistoryOptions>("{}").unwrap(), HistoryOptions::default());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryOptions {
    /// How candidate patches are computed before verification.
    pub strategy: DiffStrategy,
}

impl HistoryOptions {
    pub fn with_strategy(mut self, strategy: DiffStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}
