//! Unified error type for the Toohak server crate.

use toohak_protocol::ProtocolError;
use toohak_room::RoomError;
use toohak_transport::TransportError;

/// Top-level error that wraps the per-layer errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so code composing the transport, protocol, and room layers can use
/// `?` and deal with one error type.
#[derive(Debug, thiserror::Error)]
pub enum ToohakError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, wrong state).
    #[error(transparent)]
    Room(#[from] RoomError),
}
