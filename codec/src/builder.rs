//! Packet construction: byte writers with the RS2 obfuscation variants and
//! a scoped bit writer.

use crate::packet::{Packet, PacketType};
use crate::STRING_TERMINATOR;
use bytes::{BufMut, BytesMut};

/// Mask of the low `bits` bits.
fn mask(bits: usize) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Accumulates a packet payload.
///
/// Writers return `&mut Self` so calls chain the way packets are usually
/// composed:
///
/// ```
/// use codec::PacketBuilder;
///
/// let packet = PacketBuilder::new(248).put_short_a(3214).put_short(3822).to_packet();
/// assert_eq!(packet.payload().as_ref(), &[0x0C, 0x0E, 0x0E, 0xEE]);
/// ```
#[derive(Debug)]
pub struct PacketBuilder {
    opcode: u8,
    packet_type: PacketType,
    buffer: BytesMut,
}

impl PacketBuilder {
    /// Creates a builder for a fixed-length packet.
    pub fn new(opcode: u8) -> Self {
        Self::with_type(opcode, PacketType::Fixed)
    }

    pub fn with_type(opcode: u8, packet_type: PacketType) -> Self {
        Self {
            opcode,
            packet_type,
            buffer: BytesMut::new(),
        }
    }

    /// Creates a builder for a header-less packet.
    pub fn raw() -> Self {
        Self::with_type(0, PacketType::Raw)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn put_byte(&mut self, value: u8) -> &mut Self {
        self.buffer.put_u8(value);
        self
    }

    /// Writes `value + 128`.
    pub fn put_byte_a(&mut self, value: u8) -> &mut Self {
        self.buffer.put_u8(value.wrapping_add(128));
        self
    }

    /// Writes the negated byte.
    pub fn put_byte_c(&mut self, value: u8) -> &mut Self {
        self.buffer.put_u8(value.wrapping_neg());
        self
    }

    /// Writes `128 - value`.
    pub fn put_byte_s(&mut self, value: u8) -> &mut Self {
        self.buffer.put_u8(128u8.wrapping_sub(value));
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.put_slice(bytes);
        self
    }

    pub fn put_short(&mut self, value: u16) -> &mut Self {
        self.buffer.put_u16(value);
        self
    }

    pub fn put_short_a(&mut self, value: u16) -> &mut Self {
        self.buffer.put_u8((value >> 8) as u8);
        self.buffer.put_u8((value as u8).wrapping_add(128));
        self
    }

    pub fn put_le_short(&mut self, value: u16) -> &mut Self {
        self.buffer.put_u16_le(value);
        self
    }

    pub fn put_le_short_a(&mut self, value: u16) -> &mut Self {
        self.buffer.put_u8((value as u8).wrapping_add(128));
        self.buffer.put_u8((value >> 8) as u8);
        self
    }

    pub fn put_int(&mut self, value: u32) -> &mut Self {
        self.buffer.put_u32(value);
        self
    }

    pub fn put_int1(&mut self, value: u32) -> &mut Self {
        let b = value.to_be_bytes();
        self.buffer.put_slice(&[b[2], b[3], b[0], b[1]]);
        self
    }

    pub fn put_int2(&mut self, value: u32) -> &mut Self {
        let b = value.to_be_bytes();
        self.buffer.put_slice(&[b[1], b[0], b[3], b[2]]);
        self
    }

    pub fn put_long(&mut self, value: u64) -> &mut Self {
        self.buffer.put_u64(value);
        self
    }

    /// Writes the string followed by the `\n` terminator.
    pub fn put_rs2_string(&mut self, value: &str) -> &mut Self {
        self.buffer.put_slice(value.as_bytes());
        self.buffer.put_u8(STRING_TERMINATOR);
        self
    }

    /// Opens a bit-access scope at the next unwritten byte.
    ///
    /// The scope mutably borrows the builder, so byte writers cannot be
    /// called until it ends. Ending it, by [`BitAccess::finish`] or by
    /// dropping it early, leaves the builder aligned to the next byte with
    /// zero padding.
    pub fn bit_access(&mut self) -> BitAccess<'_> {
        let bit_position = self.buffer.len() * 8;
        BitAccess {
            builder: self,
            bit_position,
        }
    }

    /// Takes the accumulated payload, leaving the builder empty.
    pub fn to_packet(&mut self) -> Packet {
        Packet::new(self.opcode, self.packet_type, self.buffer.split().freeze())
    }
}

/// Open bit-access scope over a [`PacketBuilder`].
#[derive(Debug)]
pub struct BitAccess<'a> {
    builder: &'a mut PacketBuilder,
    bit_position: usize,
}

impl BitAccess<'_> {
    /// Writes the low `bits` bits of `value`, most significant bit first.
    pub fn put_bits(&mut self, bits: usize, value: u32) -> &mut Self {
        debug_assert!(bits <= 32, "at most 32 bits per write");
        if bits == 0 {
            return self;
        }

        let mut remaining = bits;
        let mut byte_pos = self.bit_position >> 3;
        let mut bit_offset = 8 - (self.bit_position & 7);
        self.bit_position += bits;

        let needed = (self.bit_position + 7) / 8;
        let buffer = &mut self.builder.buffer;
        if buffer.len() < needed {
            buffer.resize(needed, 0);
        }

        while remaining > bit_offset {
            let chunk = (value >> (remaining - bit_offset)) & mask(bit_offset);
            buffer[byte_pos] &= !(mask(bit_offset) as u8);
            buffer[byte_pos] |= chunk as u8;
            byte_pos += 1;
            remaining -= bit_offset;
            bit_offset = 8;
        }

        let shift = bit_offset - remaining;
        let field = mask(remaining) << shift;
        buffer[byte_pos] &= !(field as u8);
        buffer[byte_pos] |= ((value & mask(remaining)) << shift) as u8;
        self
    }

    pub fn put_bit(&mut self, flag: bool) -> &mut Self {
        self.put_bits(1, u32::from(flag))
    }

    /// Bits written since the builder started, including earlier bytes.
    pub fn bit_position(&self) -> usize {
        self.bit_position
    }

    /// Closes the scope.
    pub fn finish(self) {}
}

impl Drop for BitAccess<'_> {
    fn drop(&mut self) {
        let aligned = (self.bit_position + 7) / 8;
        self.builder.buffer.resize(aligned, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obfuscated_shorts() {
        let packet = PacketBuilder::new(1)
            .put_short(0x1234)
            .put_short_a(0x1234)
            .put_le_short(0x1234)
            .put_le_short_a(0x1234)
            .to_packet();
        assert_eq!(
            packet.payload().as_ref(),
            &[0x12, 0x34, 0x12, 0xB4, 0x34, 0x12, 0xB4, 0x12]
        );
    }

    #[test]
    fn test_int_orders() {
        let packet = PacketBuilder::new(1)
            .put_int(0x01020304)
            .put_int1(0x01020304)
            .put_int2(0x01020304)
            .to_packet();
        assert_eq!(
            packet.payload().as_ref(),
            &[1, 2, 3, 4, 3, 4, 1, 2, 2, 1, 4, 3]
        );
    }

    #[test]
    fn test_byte_variants_round_trip() {
        let mut packet = PacketBuilder::new(1)
            .put_byte_a(7)
            .put_byte_c(7)
            .put_byte_s(7)
            .to_packet();
        assert_eq!(packet.get_byte_a().unwrap(), 7);
        assert_eq!(packet.get_byte_c().unwrap(), 7);
        assert_eq!(packet.get_byte_s().unwrap(), 7);
    }

    #[test]
    fn test_rs2_string() {
        let packet = PacketBuilder::with_type(253, PacketType::Variable)
            .put_rs2_string("hi")
            .to_packet();
        assert_eq!(packet.payload().as_ref(), b"hi\n");
        assert_eq!(packet.packet_type(), PacketType::Variable);
    }

    #[test]
    fn test_bits_are_msb_first() {
        let mut builder = PacketBuilder::new(1);
        let mut bits = builder.bit_access();
        bits.put_bits(1, 1).put_bits(3, 0b010).put_bits(4, 0b1111);
        bits.finish();
        assert_eq!(builder.to_packet().payload().as_ref(), &[0b1010_1111]);
    }

    #[test]
    fn test_bits_split_across_bytes() {
        let mut builder = PacketBuilder::new(1);
        let mut bits = builder.bit_access();
        bits.put_bits(4, 0xA).put_bits(12, 0xBCD);
        bits.finish();
        assert_eq!(builder.to_packet().payload().as_ref(), &[0xAB, 0xCD]);
    }

    #[test]
    fn test_finish_pads_to_byte_boundary() {
        let mut builder = PacketBuilder::new(1);
        builder.put_byte(0xFF);
        {
            let mut bits = builder.bit_access();
            assert_eq!(bits.bit_position(), 8);
            bits.put_bits(3, 0b111);
            bits.finish();
        }
        builder.put_byte(0x42);
        assert_eq!(
            builder.to_packet().payload().as_ref(),
            &[0xFF, 0b1110_0000, 0x42]
        );
    }

    #[test]
    fn test_dropped_scope_realigns() {
        let mut builder = PacketBuilder::new(1);
        {
            let mut bits = builder.bit_access();
            bits.put_bit(true);
            // dropped without finish
        }
        builder.put_short(0x0102);
        assert_eq!(builder.len(), 3);
    }

    #[test]
    fn test_wide_value_is_truncated_to_width() {
        let mut builder = PacketBuilder::new(1);
        let mut bits = builder.bit_access();
        bits.put_bits(4, 0xFF);
        bits.put_bits(4, 0);
        bits.finish();
        assert_eq!(builder.to_packet().payload().as_ref(), &[0xF0]);
    }

    #[test]
    fn test_to_packet_resets_builder() {
        let mut builder = PacketBuilder::new(9);
        builder.put_byte(1);
        let first = builder.to_packet();
        assert_eq!(first.opcode(), 9);
        assert!(builder.is_empty());
    }
}
