use thiserror::Error;

/// Why a snapshot could not be written or read back.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The context (or a value inside the state) refused to serialize.
    #[error("cannot encode snapshot")]
    Encode(#[source] serde_json::Error),

    /// The input is not JSON, or does not have the shape of a snapshot for
    /// this context type.
    #[error("malformed snapshot")]
    Malformed(#[source] serde_json::Error),

    #[error("snapshot has no format version")]
    MissingVersion,

    /// Written by a different format version than this crate reads.
    #[error("snapshot format v{found} cannot be read (expected v{expected})")]
    VersionMismatch { found: u64, expected: u32 },
}
