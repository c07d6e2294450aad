//! Error type shared by the reader and the lookup functions.
//!
//! A missing entry is not an error: lookups return `Ok(None)` for it.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The archive buffer is empty or absent.
    #[error("invalid stream: archive buffer is empty or missing")]
    InvalidStream,

    /// The header at `offset` failed checksum validation or holds a bad numeric field.
    #[error("malformed header at offset {offset}: {reason}")]
    MalformedHeader { offset: usize, reason: &'static str },

    /// The archive ends before `needed` bytes could be read at `offset`.
    #[error("short read at offset {offset}: needed {needed} bytes, {available} available")]
    ShortRead {
        offset: usize,
        needed: u64,
        available: usize,
    },

    /// The output buffer given to `read_data` does not match the entry size.
    #[error("output buffer holds {actual} bytes, entry has {expected}")]
    BufferSize { expected: u64, actual: usize },
}
