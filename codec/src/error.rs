use thiserror::Error;

/// Errors raised while reading or framing RS2 packets.
///
/// Writing never fails: values wider than their field are truncated by the
/// writer, which is the caller's responsibility.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("packet underflow: needed {needed} bytes, {remaining} remaining")]
    Underflow { needed: usize, remaining: usize },

    #[error("string is missing its terminator")]
    UnterminatedString,

    #[error("unexpected handshake service {0}")]
    InvalidHandshake(u8),

    #[error("unexpected login type {0}")]
    InvalidLoginType(u8),

    #[error("malformed login block: {0}")]
    InvalidLoginBlock(&'static str),

    #[error("frame of {length} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { length: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
