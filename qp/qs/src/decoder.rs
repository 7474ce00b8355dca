//! Host-side decoder for the QS wire format
//!
//! Feeds on the raw byte stream drained from a [`QSBuffer`](crate::QSBuffer),
//! removes the byte stuffing, splits frames on the flag byte and verifies
//! each checksum.

use core::fmt;

use heapless::Vec;

use crate::buffer::hdlc::{ESC, ESC_XOR, FLAG, GOOD_CHKSUM};

/// Represents a fully decoded QS frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QSFrame<const M: usize> {
    /// Sequence counter maintained by the emitter.
    pub seq: u8,
    /// Record identifier (QS record type).
    pub record_type: u8,
    /// Unescaped payload bytes, checksum removed.
    pub payload: Vec<u8, M>,
}

/// Errors produced while decoding QS frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than seq, record id and checksum bytes between two flags
    FrameTooShort(usize),
    /// The frame does not fit the decoder's buffer
    FrameTooLong,
    /// Sum of the frame bytes differs from the good checksum
    InvalidChecksum { sum: u8 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::FrameTooShort(len) => write!(f, "frame too short (len={})", len),
            DecodeError::FrameTooLong => write!(f, "frame exceeds decoder capacity"),
            DecodeError::InvalidChecksum { sum } => {
                write!(f, "checksum mismatch: frame sums to {:#04x}", sum)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Incremental decoder that accepts one byte at a time and yields
/// verified QS frames of at most `M` unescaped bytes.
#[derive(Debug, Default)]
pub struct HdlcDecoder<const M: usize> {
    buffer: Vec<u8, M>,
    escape_next: bool,
    overflow: bool,
}

impl<const M: usize> HdlcDecoder<M> {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            escape_next: false,
            overflow: false,
        }
    }

    /// Clears any partial frame state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.escape_next = false;
        self.overflow = false;
    }

    /// Feeds one raw byte; returns a result when a flag closes a frame.
    pub fn push(&mut self, byte: u8) -> Option<Result<QSFrame<M>, DecodeError>> {
        if byte == FLAG {
            if self.buffer.is_empty() && !self.overflow {
                self.escape_next = false;
                return None;
            }
            let result = if self.overflow {
                Err(DecodeError::FrameTooLong)
            } else {
                Self::decode_frame(&self.buffer)
            };
            self.reset();
            return Some(result);
        }

        let byte = if self.escape_next {
            self.escape_next = false;
            byte ^ ESC_XOR
        } else if byte == ESC {
            self.escape_next = true;
            return None;
        } else {
            byte
        };

        if self.buffer.push(byte).is_err() {
            self.overflow = true;
        }
        None
    }

    /// Feeds a chunk of bytes, calling `on_frame` for every closed frame.
    pub fn push_bytes<F>(&mut self, input: &[u8], mut on_frame: F)
    where
        F: FnMut(Result<QSFrame<M>, DecodeError>),
    {
        for &byte in input {
            if let Some(result) = self.push(byte) {
                on_frame(result);
            }
        }
    }

    fn decode_frame(data: &[u8]) -> Result<QSFrame<M>, DecodeError> {
        if data.len() < 3 {
            return Err(DecodeError::FrameTooShort(data.len()));
        }

        let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != GOOD_CHKSUM {
            return Err(DecodeError::InvalidChecksum { sum });
        }

        let mut payload = Vec::new();
        // data.len() <= M, so the payload always fits
        let _ = payload.extend_from_slice(&data[2..data.len() - 1]);

        Ok(QSFrame {
            seq: data[0],
            record_type: data[1],
            payload,
        })
    }
}
