//! Trace buffer shared between execution contexts
//!
//! Producers and the draining transport usually run in different
//! contexts (task and UART interrupt, say). Each call below takes its own
//! critical section, so a single encoder call is atomic with respect to
//! the consumer. Use [`SharedBuffer::with`] to emit a whole record under
//! one critical section.

use core::cell::RefCell;
use core::convert::Infallible;

use critical_section::Mutex;

use crate::buffer::{QSBuffer, TargetInfo};
use crate::types::{QSConfig, QSFilter, QSRecordType};
use crate::QSpy;

/// QS buffer behind a `critical_section::Mutex`, usable from a `static`
pub struct SharedBuffer<const N: usize> {
    inner: Mutex<RefCell<QSBuffer<N>>>,
}

impl<const N: usize> SharedBuffer<N> {
    /// Create a new shared buffer
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(QSBuffer::new())),
        }
    }

    /// Run `f` on the buffer inside one critical section
    pub fn with<R>(&self, f: impl FnOnce(&mut QSBuffer<N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs)))
    }

    /// Initialize the QS tracing system
    pub fn init(&self) {
        self.with(|qs| qs.init());
    }

    /// Set QS configuration
    pub fn set_config(&self, config: QSConfig) {
        self.with(|qs| qs.set_config(config));
    }

    /// Get current configuration
    pub fn config(&self) -> QSConfig {
        self.with(|qs| *qs.config())
    }

    /// Install the function that supplies timestamps
    pub fn set_time_source(&self, source: fn() -> u32) {
        self.with(|qs| qs.set_time_source(source));
    }

    /// Enable the selected records
    pub fn filter_on(&self, filter: QSFilter) {
        self.with(|qs| qs.filter_on(filter));
    }

    /// Disable the selected records
    pub fn filter_off(&self, filter: QSFilter) {
        self.with(|qs| qs.filter_off(filter));
    }

    /// Limit state machine records to one object
    pub fn set_sm_obj_filter(&self, obj: Option<usize>) {
        self.with(|qs| qs.set_sm_obj_filter(obj));
    }

    /// Emit a signal dictionary entry
    pub fn sig_dict(&self, sig: u16, obj: usize, name: &str) {
        self.with(|qs| qs.sig_dict(sig, obj, name));
    }

    /// Emit an object dictionary entry
    pub fn obj_dict(&self, obj: usize, name: &str) {
        self.with(|qs| qs.obj_dict(obj, name));
    }

    /// Emit a function dictionary entry
    pub fn fun_dict(&self, fun: usize, name: &str) {
        self.with(|qs| qs.fun_dict(fun, name));
    }

    /// Emit a user record dictionary entry
    pub fn usr_dict(&self, rec: u8, name: &str) {
        self.with(|qs| qs.usr_dict(rec, name));
    }

    /// Emit the `QS_TARGET_INFO` record
    pub fn target_info(&self, info: &TargetInfo) {
        self.with(|qs| qs.target_info(info));
    }

    /// Take the oldest byte, `WouldBlock` while the buffer is empty
    pub fn get_byte(&self) -> nb::Result<u8, Infallible> {
        self.with(|qs| qs.get_byte()).ok_or(nb::Error::WouldBlock)
    }

    /// Read available bytes from buffer
    /// Returns the number of bytes read
    pub fn read(&self, buf: &mut [u8]) -> usize {
        self.with(|qs| qs.read(buf))
    }

    /// Get number of bytes available to read from QS buffer
    pub fn available(&self) -> usize {
        self.with(|qs| qs.used())
    }
}

impl<const N: usize> Default for SharedBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> QSpy for &SharedBuffer<N> {
    fn begin(&mut self, rec: QSRecordType, obj: usize) -> bool {
        self.with(|qs| qs.begin(rec, obj))
    }

    fn end(&mut self) {
        self.with(|qs| qs.end());
    }

    fn time(&mut self) {
        self.with(|qs| qs.time());
    }

    fn u8(&mut self, value: u8) {
        self.with(|qs| qs.u8(value));
    }

    fn u16(&mut self, value: u16) {
        self.with(|qs| qs.u16(value));
    }

    fn u32(&mut self, value: u32) {
        self.with(|qs| qs.u32(value));
    }

    fn sig(&mut self, sig: u16) {
        self.with(|qs| qs.sig(sig));
    }

    fn obj(&mut self, obj: usize) {
        self.with(|qs| qs.obj(obj));
    }

    fn fun(&mut self, fun: usize) {
        self.with(|qs| qs.fun(fun));
    }
}
