//! Wire types for the Imoji sticker service API.
//!
//! This crate contains the serde-serializable types exchanged with the Imoji
//! REST API. These types represent the "protocol layer": the shapes of data
//! as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Lenient on input: optional server fields default instead of failing
//! * Stable: Changes only when the service contract changes
//!
//! The session, rendering and caching layers live in `imoji-rs`.

pub mod auth_exchange;
pub mod endpoints;
pub mod envelope;
pub mod requests;
pub mod types;

pub use auth_exchange::*;
pub use endpoints::*;
pub use envelope::*;
pub use requests::*;
pub use types::*;
