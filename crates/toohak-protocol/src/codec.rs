//! Codec trait and the JSON implementation.
//!
//! A codec converts between wire types and the text of a frame. The rest
//! of the workspace talks to the [`Codec`] trait, not to `serde_json`
//! directly, so a binary format could be slotted in later without touching
//! the handler or transport code.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes wire types to frame text and decodes frame text back.
///
/// `Send + Sync + 'static` because the codec is shared across connection
/// tasks for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into the text of one frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes one frame's text back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the text is malformed or does
    /// not match the expected shape.
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] producing the JSON text frames the web client speaks.
///
/// ## Example
///
/// ```rust
/// use toohak_protocol::{ClientCommand, Codec, JsonCodec, RoomId};
///
/// let codec = JsonCodec;
///
/// let cmd = ClientCommand::LeaveRoom {
///     room_id: RoomId::from("abcd"),
/// };
///
/// let text = codec.encode(&cmd).unwrap();
/// let decoded: ClientCommand = codec.decode(&text).unwrap();
/// assert_eq!(cmd, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}
