//! The login exchange that precedes opcode framing.
//!
//! The secure block is read in the clear; RSA and the ISAAC opcode cipher
//! are layered outside this crate.

use crate::builder::PacketBuilder;
use crate::error::{CodecError, Result};
use crate::packet::Packet;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const HANDSHAKE_SERVICE: u8 = 14;
pub const LOGIN_NEW: u8 = 16;
pub const LOGIN_RECONNECT: u8 = 18;
pub const LOGIN_MAGIC: u8 = 255;
pub const REVISION: u16 = 317;
pub const SECURE_BLOCK_MARKER: u8 = 10;
pub const ARCHIVE_COUNT: usize = 9;

/// Bytes of the login block before the secure block.
const BLOCK_HEADER_LEN: usize = 1 + 2 + 1 + ARCHIVE_COUNT * 4 + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Handshake,
    Header,
    Block { reconnecting: bool, length: usize },
    Done,
}

/// A decoded login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub reconnecting: bool,
    pub revision: u16,
    pub low_memory: bool,
    pub archive_crcs: [u32; ARCHIVE_COUNT],
    pub client_key: u64,
    pub server_key: u64,
    pub uid: u32,
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: &str, password: &str, server_key: u64) -> Self {
        Self {
            reconnecting: false,
            revision: REVISION,
            low_memory: false,
            archive_crcs: [0; ARCHIVE_COUNT],
            client_key: 0,
            server_key,
            uid: 0,
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginEvent {
    /// The client asked for the login service. Answer with
    /// [`handshake_response`].
    Handshake { name_hash: u8 },
    Request(LoginRequest),
}

/// Incremental decoder for one connection's login exchange.
#[derive(Debug)]
pub struct LoginDecoder {
    stage: Stage,
}

impl Default for LoginDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginDecoder {
    pub fn new() -> Self {
        Self {
            stage: Stage::Handshake,
        }
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Consumes as much of `buf` as the current stage needs.
    ///
    /// Returns `Ok(None)` when more bytes are required. After a
    /// [`LoginEvent::Request`] the decoder is done and leaves any following
    /// bytes for the frame decoder.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<LoginEvent>> {
        loop {
            match self.stage {
                Stage::Handshake => {
                    if buf.len() < 2 {
                        return Ok(None);
                    }
                    let service = buf.get_u8();
                    if service != HANDSHAKE_SERVICE {
                        return Err(CodecError::InvalidHandshake(service));
                    }
                    let name_hash = buf.get_u8();
                    self.stage = Stage::Header;
                    return Ok(Some(LoginEvent::Handshake { name_hash }));
                }
                Stage::Header => {
                    if buf.len() < 2 {
                        return Ok(None);
                    }
                    let login_type = buf.get_u8();
                    let reconnecting = match login_type {
                        LOGIN_NEW => false,
                        LOGIN_RECONNECT => true,
                        other => return Err(CodecError::InvalidLoginType(other)),
                    };
                    let length = buf.get_u8() as usize;
                    self.stage = Stage::Block {
                        reconnecting,
                        length,
                    };
                }
                Stage::Block {
                    reconnecting,
                    length,
                } => {
                    if buf.len() < length {
                        return Ok(None);
                    }
                    let block = buf.split_to(length).freeze();
                    let request = decode_block(block, reconnecting)?;
                    self.stage = Stage::Done;
                    return Ok(Some(LoginEvent::Request(request)));
                }
                Stage::Done => return Ok(None),
            }
        }
    }
}

fn decode_block(block: Bytes, reconnecting: bool) -> Result<LoginRequest> {
    let mut packet = Packet::raw(block);

    if packet.get_unsigned_byte()? != LOGIN_MAGIC {
        return Err(CodecError::InvalidLoginBlock("bad magic"));
    }
    let revision = packet.get_unsigned_short()?;
    let low_memory = packet.get_unsigned_byte()? == 1;
    let mut archive_crcs = [0u32; ARCHIVE_COUNT];
    for crc in archive_crcs.iter_mut() {
        *crc = packet.get_int()? as u32;
    }

    let secure_length = packet.get_unsigned_byte()? as usize;
    if secure_length != packet.remaining() {
        return Err(CodecError::InvalidLoginBlock("secure block length mismatch"));
    }
    if packet.get_unsigned_byte()? != SECURE_BLOCK_MARKER {
        return Err(CodecError::InvalidLoginBlock("bad secure block marker"));
    }

    let client_key = packet.get_long()? as u64;
    let server_key = packet.get_long()? as u64;
    let uid = packet.get_int()? as u32;
    let username = packet.get_rs2_string()?;
    let password = packet.get_rs2_string()?;

    Ok(LoginRequest {
        reconnecting,
        revision,
        low_memory,
        archive_crcs,
        client_key,
        server_key,
        uid,
        username,
        password,
    })
}

/// Eight ignored bytes, status 0, then the server's session key.
pub fn handshake_response(server_key: u64) -> Packet {
    PacketBuilder::raw()
        .put_bytes(&[0; 8])
        .put_byte(0)
        .put_long(server_key)
        .to_packet()
}

/// The three byte login result: `[code][rights][0]`.
pub fn login_response(return_code: u8, rights: u8) -> Packet {
    PacketBuilder::raw()
        .put_byte(return_code)
        .put_byte(rights)
        .put_byte(0)
        .to_packet()
}

/// Client side of the handshake.
pub fn encode_handshake(name_hash: u8) -> Bytes {
    Bytes::copy_from_slice(&[HANDSHAKE_SERVICE, name_hash])
}

/// Client side of the login header and block.
pub fn encode_login_request(request: &LoginRequest) -> Bytes {
    let mut secure = PacketBuilder::raw();
    secure
        .put_byte(SECURE_BLOCK_MARKER)
        .put_long(request.client_key)
        .put_long(request.server_key)
        .put_int(request.uid)
        .put_rs2_string(&request.username)
        .put_rs2_string(&request.password);
    let secure = secure.to_packet();

    let mut out = BytesMut::new();
    out.put_u8(if request.reconnecting {
        LOGIN_RECONNECT
    } else {
        LOGIN_NEW
    });
    out.put_u8((BLOCK_HEADER_LEN + secure.len()) as u8);
    out.put_u8(LOGIN_MAGIC);
    out.put_u16(request.revision);
    out.put_u8(u8::from(request.low_memory));
    for crc in request.archive_crcs {
        out.put_u32(crc);
    }
    out.put_u8(secure.len() as u8);
    out.put_slice(secure.payload());
    out.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_exchange() {
        let mut decoder = LoginDecoder::new();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&encode_handshake(7));
        assert_eq!(
            decoder.decode(&mut buf).unwrap(),
            Some(LoginEvent::Handshake { name_hash: 7 })
        );

        let request = LoginRequest::new("zezima", "hunter2", 0xDEAD_BEEF);
        let encoded = encode_login_request(&request);

        // Feed the block in two halves
        let (first, second) = encoded.split_at(encoded.len() / 2);
        buf.extend_from_slice(first);
        assert_eq!(decoder.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(second);
        buf.extend_from_slice(&[0]);

        match decoder.decode(&mut buf).unwrap() {
            Some(LoginEvent::Request(decoded)) => assert_eq!(decoded, request),
            other => panic!("Unexpected event: {:?}", other),
        }
        assert!(decoder.is_done());
        // Trailing game bytes stay in the buffer
        assert_eq!(buf.as_ref(), &[0]);
    }

    #[test]
    fn test_bad_handshake_service() {
        let mut decoder = LoginDecoder::new();
        let mut buf = BytesMut::from(&[15u8, 0][..]);
        assert_eq!(decoder.decode(&mut buf), Err(CodecError::InvalidHandshake(15)));
    }

    #[test]
    fn test_bad_login_type() {
        let mut decoder = LoginDecoder::new();
        let mut buf = BytesMut::from(&[14u8, 0, 17, 0][..]);
        assert!(decoder.decode(&mut buf).unwrap().is_some());
        assert_eq!(decoder.decode(&mut buf), Err(CodecError::InvalidLoginType(17)));
    }

    #[test]
    fn test_bad_magic() {
        let mut decoder = LoginDecoder::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&encode_handshake(0));
        decoder.decode(&mut buf).unwrap();

        let mut encoded = BytesMut::from(encode_login_request(&LoginRequest::new("a", "b", 1)).as_ref());
        encoded[2] = 0;
        buf.extend_from_slice(&encoded);
        assert_eq!(
            decoder.decode(&mut buf),
            Err(CodecError::InvalidLoginBlock("bad magic"))
        );
    }

    #[test]
    fn test_login_response_bytes() {
        assert_eq!(login_response(2, 1).payload().as_ref(), &[2, 1, 0]);
        assert!(login_response(3, 0).is_raw());
    }

    #[test]
    fn test_handshake_response_layout() {
        let packet = handshake_response(0x0102030405060708);
        let payload = packet.payload();
        assert_eq!(payload.len(), 17);
        assert_eq!(&payload[..9], &[0; 9]);
        assert_eq!(&payload[9..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
