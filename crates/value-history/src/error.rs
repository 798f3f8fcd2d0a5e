use thiserror::Error;
use value_history_patch::PatchError;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to convert value into a document: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to convert document into a value: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("patch set {index} does not apply: {source}")]
    Replay {
        index: usize,
        #[source]
        source: PatchError,
    },
    #[error("history has been cleared")]
    Cleared,
}

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot log is empty")]
    EmptyLog,
    #[error("first snapshot entry must be the empty patch set")]
    BaselineEntryNotEmpty,
    #[error("snapshot position {position} is outside a log of {size} entries")]
    PositionOutOfRange { position: usize, size: usize },
    #[error("snapshot patch set {index} does not apply: {source}")]
    Replay {
        index: usize,
        #[source]
        source: PatchError,
    },
}
