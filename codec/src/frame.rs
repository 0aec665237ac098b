//! Opcode framing: `[opcode][length?][payload]`.

use crate::error::{CodecError, Result};
use crate::packet::{Packet, PacketType};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size-table marker for a one-byte length prefix.
pub const VARIABLE: i16 = -1;
/// Size-table marker for a two-byte length prefix.
pub const VARIABLE_SHORT: i16 = -2;

/// Largest inbound payload a decoder accepts unless configured otherwise.
pub const DEFAULT_MAX_PAYLOAD: usize = 5000;

const fn size_table(entries: &[(u8, i16)]) -> [i16; 256] {
    let mut table = [0i16; 256];
    let mut i = 0;
    while i < entries.len() {
        table[entries[i].0 as usize] = entries[i].1;
        i += 1;
    }
    table
}

/// Payload sizes of client-to-server packets. Unlisted opcodes carry no
/// payload.
pub const CLIENT_PACKET_SIZES: [i16; 256] = size_table(&[
    (0, 0),         // keep alive
    (3, 1),         // focus change
    (4, VARIABLE),  // chat
    (36, 4),        // anti-cheat
    (40, 2),        // dialogue continue
    (41, 6),        // equip item
    (77, VARIABLE), // anti-cheat
    (86, 4),        // camera movement
    (87, 6),        // drop item
    (95, 3),        // privacy options
    (98, VARIABLE), // walk on command
    (101, 13),      // character design
    (103, VARIABLE),// command
    (121, 0),       // region loaded
    (122, 6),       // item option
    (130, 0),       // close interface
    (145, 6),       // remove item
    (164, VARIABLE),// walk
    (185, 2),       // action button
    (202, 0),       // idle
    (210, 4),       // region changed
    (214, 7),       // switch item
    (236, 6),       // pick up item
    (241, 4),       // mouse click
    (248, VARIABLE),// minimap walk
]);

/// Payload sizes of the server-to-client packets this server emits.
pub const SERVER_PACKET_SIZES: [i16; 256] = size_table(&[
    (34, VARIABLE_SHORT),  // update item slots
    (53, VARIABLE_SHORT),  // update items
    (71, 3),               // sidebar interface
    (73, 4),               // map region
    (107, 0),              // reset camera
    (109, 0),              // logout
    (134, 6),              // skill
    (241, VARIABLE_SHORT), // construct map region
    (248, 4),              // inventory interface
    (249, 3),              // player details
    (253, VARIABLE),       // message
]);

/// Writes a packet with its opcode and, for variable packets, the length
/// of the already buffered payload.
pub fn encode_frame(packet: &Packet) -> Bytes {
    let payload = packet.payload();
    let mut out = BytesMut::with_capacity(payload.len() + 3);
    match packet.packet_type() {
        PacketType::Raw => {}
        PacketType::Fixed => out.put_u8(packet.opcode()),
        PacketType::Variable => {
            debug_assert!(payload.len() <= u8::MAX as usize, "variable payload too long");
            out.put_u8(packet.opcode());
            out.put_u8(payload.len() as u8);
        }
        PacketType::VariableShort => {
            debug_assert!(payload.len() <= u16::MAX as usize, "variable short payload too long");
            out.put_u8(packet.opcode());
            out.put_u16(payload.len() as u16);
        }
    }
    out.put_slice(payload);
    out.freeze()
}

/// Splits a byte stream into packets using a size table.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    sizes: &'static [i16; 256],
    max_payload: usize,
}

impl FrameDecoder {
    pub fn new(sizes: &'static [i16; 256]) -> Self {
        Self {
            sizes,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Decoder for packets sent by a client.
    pub fn client() -> Self {
        Self::new(&CLIENT_PACKET_SIZES)
    }

    /// Decoder for packets sent by the server.
    pub fn server() -> Self {
        Self {
            sizes: &SERVER_PACKET_SIZES,
            max_payload: u16::MAX as usize,
        }
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Takes one complete packet off the front of `buf`.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched while the packet is
    /// still incomplete.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Packet>> {
        let Some(&opcode) = buf.first() else {
            return Ok(None);
        };

        let size = self.sizes[opcode as usize];
        let (packet_type, header, length) = match size {
            VARIABLE => match buf.get(1) {
                Some(&len) => (PacketType::Variable, 2, len as usize),
                None => return Ok(None),
            },
            VARIABLE_SHORT => {
                if buf.len() < 3 {
                    return Ok(None);
                }
                let len = u16::from_be_bytes([buf[1], buf[2]]) as usize;
                (PacketType::VariableShort, 3, len)
            }
            fixed => (PacketType::Fixed, 1, fixed.max(0) as usize),
        };

        if length > self.max_payload {
            return Err(CodecError::FrameTooLarge {
                length,
                limit: self.max_payload,
            });
        }
        if buf.len() < header + length {
            return Ok(None);
        }

        buf.advance(header);
        let payload = buf.split_to(length).freeze();
        Ok(Some(Packet::new(opcode, packet_type, payload)))
    }
}
