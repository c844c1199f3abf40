//! A client-side implementation of the FreeCiv wire protocol: framing,
//! delta decoding, the packet schema registry, and a synchronous
//! connection/handshake state machine built on top of them.
//!
//! Start at [`connection::Connection`] for the handshake and steady-state
//! dispatch loop, or at [`game_state::GameState`] for what gets tracked
//! from the packets received along the way.

pub mod cache;
pub mod capture;
pub mod config;
pub mod connection;
pub mod delta;
pub mod error;
pub mod frame;
pub mod game_state;
pub mod handler;
pub mod handlers;
pub mod primitive;
pub mod schema;
pub mod value;

pub use config::ClientConfig;
pub use connection::Connection;
pub use error::{Error, Result};
pub use game_state::GameState;
