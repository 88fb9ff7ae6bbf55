//! Room lifecycle management for Toohak.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! member list, admin seat, chat, game instance, and game timer. The
//! registry creates rooms on demand, routes commands to them, and keeps
//! the player-to-rooms index that disconnect clean-up walks.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates/destroys rooms, routes players
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomConfig`]: player limits
//! - [`PlayerSender`]: per-player outbound event channel

mod config;
mod error;
mod registry;
mod room;

pub use config::{RoomConfig, derive_lobby_status};
pub use error::RoomError;
pub use registry::{JoinKind, JoinOutcome, RoomRegistry};
pub use room::{PlayerSender, RoomHandle};
