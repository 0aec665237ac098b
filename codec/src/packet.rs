//! Immutable packets and the readers used by packet handlers.

use crate::error::{CodecError, Result};
use crate::STRING_TERMINATOR;
use bytes::{Buf, Bytes};

/// How a packet describes its own length on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Length is known by both sides from the opcode alone.
    Fixed,
    /// One length byte follows the opcode.
    Variable,
    /// A big-endian two byte length follows the opcode.
    VariableShort,
    /// No opcode and no length: the payload is written as-is.
    Raw,
}

/// An opcode plus its payload.
///
/// Reading advances an internal cursor over a cheaply cloned `Bytes`, so a
/// handler can consume fields in order without copying the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    opcode: u8,
    packet_type: PacketType,
    payload: Bytes,
}

impl Packet {
    pub fn new(opcode: u8, packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            packet_type,
            payload: payload.into(),
        }
    }

    /// Creates a header-less packet.
    pub fn raw(payload: impl Into<Bytes>) -> Self {
        Self::new(0, PacketType::Raw, payload)
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn is_raw(&self) -> bool {
        self.packet_type == PacketType::Raw
    }

    /// Unread payload bytes.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.payload.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let remaining = self.payload.remaining();
        if remaining < needed {
            return Err(CodecError::Underflow { needed, remaining });
        }
        Ok(())
    }

    fn next(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.payload.get_u8())
    }

    pub fn get_byte(&mut self) -> Result<i8> {
        Ok(self.next()? as i8)
    }

    pub fn get_unsigned_byte(&mut self) -> Result<u8> {
        self.next()
    }

    /// Reads a byte written with an added offset of 128.
    pub fn get_byte_a(&mut self) -> Result<i8> {
        Ok(self.next()?.wrapping_sub(128) as i8)
    }

    /// Reads a negated byte.
    pub fn get_byte_c(&mut self) -> Result<i8> {
        Ok((self.next()? as i8).wrapping_neg())
    }

    /// Reads a byte subtracted from 128.
    pub fn get_byte_s(&mut self) -> Result<i8> {
        Ok(128u8.wrapping_sub(self.next()?) as i8)
    }

    pub fn get_short(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.payload.get_i16())
    }

    pub fn get_unsigned_short(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.payload.get_u16())
    }

    /// Big-endian short whose low byte carries the +128 offset.
    pub fn get_short_a(&mut self) -> Result<i16> {
        self.ensure(2)?;
        let high = self.payload.get_u8();
        let low = self.payload.get_u8().wrapping_sub(128);
        Ok(i16::from_be_bytes([high, low]))
    }

    pub fn get_le_short(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.payload.get_i16_le())
    }

    /// Little-endian short whose low byte carries the +128 offset.
    pub fn get_le_short_a(&mut self) -> Result<i16> {
        self.ensure(2)?;
        let low = self.payload.get_u8().wrapping_sub(128);
        let high = self.payload.get_u8();
        Ok(i16::from_le_bytes([low, high]))
    }

    pub fn get_int(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.payload.get_i32())
    }

    /// Middle-endian int: the wire holds big-endian bytes 2, 3, 0, 1.
    pub fn get_int1(&mut self) -> Result<i32> {
        self.ensure(4)?;
        let mut b = [0u8; 4];
        self.payload.copy_to_slice(&mut b);
        Ok(i32::from_be_bytes([b[2], b[3], b[0], b[1]]))
    }

    /// Middle-endian int: the wire holds big-endian bytes 1, 0, 3, 2.
    pub fn get_int2(&mut self) -> Result<i32> {
        self.ensure(4)?;
        let mut b = [0u8; 4];
        self.payload.copy_to_slice(&mut b);
        Ok(i32::from_be_bytes([b[1], b[0], b[3], b[2]]))
    }

    pub fn get_long(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.payload.get_i64())
    }

    /// Reads a newline-terminated string.
    pub fn get_rs2_string(&mut self) -> Result<String> {
        let end = self
            .payload
            .iter()
            .position(|&b| b == STRING_TERMINATOR)
            .ok_or(CodecError::UnterminatedString)?;
        let text = String::from_utf8_lossy(&self.payload[..end]).into_owned();
        self.payload.advance(end + 1);
        Ok(text)
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.ensure(len)?;
        Ok(self.payload.split_to(len))
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.payload.advance(len);
        Ok(())
    }
}
