//! Error types for the protocol layer, and the shared rejection taxonomy.

/// The recovery class of a rejected operation.
///
/// Domain errors expose a `category()` accessor mapping onto one of these
/// three, and callers shape acks from it uniformly: `NotFound` and
/// `Rejected` become failure acks, while `AlreadySatisfied` marks
/// idempotent no-ops that ack as success (for example, a join from a
/// player who is already seated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The addressed room or player does not exist.
    NotFound,
    /// A business rule refused the operation: room full, wrong game
    /// state, not the admin, a duplicate answer, a stale round reference.
    Rejected,
    /// The requested state already holds; nothing was changed.
    AlreadySatisfied,
}

/// Errors from encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed while turning a value into frame text.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A frame could not be parsed: malformed JSON, a missing field, or
    /// an unknown `cmd` tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
