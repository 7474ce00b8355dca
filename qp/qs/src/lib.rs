#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! QS - Software Tracing Infrastructure
//!
//! Byte-stuffed, checksummed trace records written into a fixed-size ring
//! buffer and drained by an external transport.
//!
//! ## Features
//!
//! - **Lossy ring buffer**: the newest data always wins, overflow is silent
//! - **HDLC-style framing**: sequence numbers, escaping and checksums
//! - **Record filtering**: per record id plus a state-machine object filter
//! - **Dictionaries and target info**: symbolic names for the host
//! - **Frame decoder**: host-side verification of the wire format
//! - **no_std Compatible**: works on bare-metal embedded targets
//!
//! ## Usage
//!
//! ```rust
//! use qp_qs::{QSBuffer, QSFilter, QSRecordType};
//!
//! let mut qs: QSBuffer<256> = QSBuffer::new();
//! qs.init();
//! qs.filter_on(QSFilter::All);
//!
//! if qs.begin(QSRecordType::QS_QEP_TRAN, 0x2000_1000) {
//!     qs.time();
//!     qs.sig(5);
//!     qs.obj(0x2000_1000);
//!     qs.fun(0x0800_1234);
//!     qs.fun(0x0800_1256);
//!     qs.end();
//! }
//!
//! let mut out = [0u8; 64];
//! let n = qs.read(&mut out);
//! assert!(n > 0);
//! ```

mod buffer;
pub mod decoder;
mod macros;
mod shared;
mod types;

pub use buffer::{hdlc, BuildStamp, QSBuffer, TargetInfo};
pub use shared::SharedBuffer;
pub use types::{filters, FormatByte, QSConfig, QSConfigBuilder, QSFilter, QSRecordType};

#[cfg(test)]
mod tests;

/// Sink for the predefined records emitted by the state machine engines.
///
/// A record is written as `begin`, the payload fields in order, then
/// `end`. Payload calls are only made after `begin` returned `true`.
pub trait QSpy {
    /// Start `rec` on behalf of `obj`; `false` if it is filtered out
    fn begin(&mut self, rec: QSRecordType, obj: usize) -> bool;
    /// Close the open record
    fn end(&mut self);
    /// Timestamp field
    fn time(&mut self);
    /// One byte
    fn u8(&mut self, value: u8);
    /// Two bytes, little endian
    fn u16(&mut self, value: u16);
    /// Four bytes, little endian
    fn u32(&mut self, value: u32);
    /// Signal field
    fn sig(&mut self, sig: u16);
    /// Object pointer field
    fn obj(&mut self, obj: usize);
    /// Function pointer field
    fn fun(&mut self, fun: usize);
}

impl<const N: usize> QSpy for QSBuffer<N> {
    fn begin(&mut self, rec: QSRecordType, obj: usize) -> bool {
        QSBuffer::begin(self, rec, obj)
    }

    fn end(&mut self) {
        QSBuffer::end(self);
    }

    fn time(&mut self) {
        QSBuffer::time(self);
    }

    fn u8(&mut self, value: u8) {
        QSBuffer::u8(self, value);
    }

    fn u16(&mut self, value: u16) {
        QSBuffer::u16(self, value);
    }

    fn u32(&mut self, value: u32) {
        QSBuffer::u32(self, value);
    }

    fn sig(&mut self, sig: u16) {
        QSBuffer::sig(self, sig);
    }

    fn obj(&mut self, obj: usize) {
        QSBuffer::obj(self, obj);
    }

    fn fun(&mut self, fun: usize) {
        QSBuffer::fun(self, fun);
    }
}

/// Sink that discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct QSDummy;

impl QSpy for QSDummy {
    fn begin(&mut self, _rec: QSRecordType, _obj: usize) -> bool {
        false
    }

    fn end(&mut self) {}
    fn time(&mut self) {}
    fn u8(&mut self, _value: u8) {}
    fn u16(&mut self, _value: u16) {}
    fn u32(&mut self, _value: u32) {}
    fn sig(&mut self, _sig: u16) {}
    fn obj(&mut self, _obj: usize) {}
    fn fun(&mut self, _fun: usize) {}
}
