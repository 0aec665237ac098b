//! # RS2 Wire Codec
//!
//! Shared by the server and the bot client: everything needed to build,
//! frame and read packets of the RS2 (revision 317) binary protocol.
//!
//! ## Framing
//!
//! Every game packet starts with a one byte opcode. The opcode alone decides
//! how the payload length is known:
//!
//! - [`PacketType::Fixed`]: both sides know the length from the opcode
//! - [`PacketType::Variable`]: one length byte follows the opcode
//! - [`PacketType::VariableShort`]: two length bytes follow the opcode
//!
//! Login traffic is written without any header ([`PacketType::Raw`]).
//!
//! ## Obfuscated Fields
//!
//! Many fields are written in a disguised form: bytes with 128 added
//! ("A"), negated ("C") or subtracted from 128 ("S"), little-endian shorts,
//! and two middle-endian int orders. [`PacketBuilder`] has a writer and
//! [`Packet`] a reader for each.
//!
//! ## Bit Access
//!
//! [`PacketBuilder::bit_access`] opens a scope for sub-byte fields. The scope
//! borrows the builder, so byte writes are impossible until it ends, and
//! ending it always pads to the next byte boundary.

pub mod bits;
pub mod builder;
pub mod error;
pub mod frame;
pub mod login;
pub mod packet;

pub use bits::BitReader;
pub use builder::{BitAccess, PacketBuilder};
pub use error::CodecError;
pub use frame::{encode_frame, FrameDecoder};
pub use packet::{Packet, PacketType};

/// Terminates every RS2 string.
pub const STRING_TERMINATOR: u8 = 10;
