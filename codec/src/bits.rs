use crate::error::{CodecError, Result};

/// Reads MSB-first bit fields written by [`crate::BitAccess`].
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn read_bits(&mut self, bits: usize) -> Result<u32> {
        debug_assert!(bits <= 32, "at most 32 bits per read");
        let available = self.data.len() * 8 - self.position;
        if bits > available {
            return Err(CodecError::Underflow {
                needed: (bits - available + 7) / 8,
                remaining: available / 8,
            });
        }

        let mut value = 0u32;
        for _ in 0..bits {
            let byte = self.data[self.position >> 3];
            let bit = (byte >> (7 - (self.position & 7))) & 1;
            value = (value << 1) | u32::from(bit);
            self.position += 1;
        }
        Ok(value)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn bit_position(&self) -> usize {
        self.position
    }

    /// Byte offset of the next byte after skipping the partial one.
    pub fn aligned_byte_position(&self) -> usize {
        (self.position + 7) / 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PacketBuilder;
    use rand::Rng;

    #[test]
    fn test_read_simple_fields() {
        let data = [0b1010_1111];
        let mut reader = BitReader::new(&data);
        assert!(reader.read_bit().unwrap());
        assert_eq!(reader.read_bits(3).unwrap(), 0b010);
        assert_eq!(reader.read_bits(4).unwrap(), 0b1111);
        assert!(reader.read_bit().is_err());
    }

    #[test]
    fn test_random_fields_round_trip() {
        let mut rng = rand::thread_rng();
        let fields: Vec<(usize, u32)> = (0..200)
            .map(|_| {
                let width = rng.gen_range(1..=32);
                let value = rng.gen::<u32>() & if width == 32 { u32::MAX } else { (1 << width) - 1 };
                (width, value)
            })
            .collect();
        let total_bits: usize = fields.iter().map(|(w, _)| w).sum();

        let mut builder = PacketBuilder::new(1);
        let mut bits = builder.bit_access();
        for (width, value) in &fields {
            bits.put_bits(*width, *value);
        }
        bits.finish();
        builder.put_byte(0x5A);
        let packet = builder.to_packet();
        let payload = packet.payload();

        let mut reader = BitReader::new(payload);
        for (width, value) in &fields {
            assert_eq!(reader.read_bits(*width).unwrap(), *value);
        }
        assert_eq!(reader.bit_position(), total_bits);

        let next = reader.aligned_byte_position();
        assert_eq!(next, (total_bits + 7) / 8);
        assert_eq!(payload[next], 0x5A);
        assert_eq!(payload.len(), next + 1);
    }
}
