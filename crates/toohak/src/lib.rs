//! # Toohak
//!
//! Real-time, room-based multiplayer quiz server.
//!
//! Clients connect over WebSocket, join rooms by id, and play short
//! timed quiz rounds against each other. The workspace splits the
//! layers apart: wire protocol (`toohak-protocol`), socket handling
//! (`toohak-transport`), room registry and actors (`toohak-room`), and
//! the game variants (`toohak-game`). This crate ties them into a
//! runnable server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> Result<(), toohak::ToohakError> {
//! use toohak::ToohakServer;
//!
//! let server = ToohakServer::builder()
//!     .bind("0.0.0.0:3000")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::ToohakError;
pub use server::{ToohakServer, ToohakServerBuilder};

/// The common imports for embedding or driving a Toohak server.
pub mod prelude {
    pub use toohak_game::{
        DeparturePolicy, GameOptions, Question, QuestionBank,
    };
    pub use toohak_protocol::{
        ClientCommand, Codec, GameKind, GameStatus, JsonCodec, PlayerId, PlayerInfo, RoomId,
        RoomSnapshot, ServerEvent,
    };
    pub use toohak_room::{RoomConfig, RoomRegistry};

    pub use crate::{ToohakError, ToohakServer, ToohakServerBuilder};
}
