//! Wire protocol for Toohak.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`ClientCommand`], [`ServerEvent`], [`RoomSnapshot`], ...):
//!   the JSON frames and the structures embedded in them.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames are converted
//!   to and from text.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! The protocol layer knows nothing about rooms, games, or connections.
//! It only fixes the wire shapes the rest of the workspace agrees on.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::{ErrorCategory, ProtocolError};
pub use types::{
    ClientCommand, GameKind, GameStatus, PlayerId, PlayerInfo, PlayerRoundView,
    Recipient, RoomId, RoomSnapshot, ScoreEntry, ServerEvent,
};
