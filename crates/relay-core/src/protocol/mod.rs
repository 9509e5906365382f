//! Protocol module containing the canonical event type and the text codec.

pub mod codec;
pub mod messages;

pub use codec::{decode, encode, DecodeError, EncodeError};
pub use messages::*;
