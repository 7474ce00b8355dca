//! QS Buffer Management
//!
//! Fixed-capacity ring buffer that frames trace records as they are
//! encoded. Every record is laid out as
//!
//! ```text
//! seq | rec | payload... | chksum | FLAG
//! ```
//!
//! where everything except `rec` and the closing `FLAG` is byte-stuffed.
//! When the producer outruns the consumer, the oldest bytes are silently
//! overwritten.

use crate::types::{FormatByte, QSConfig, QSFilter, QSRecordType};

/// HDLC protocol constants
pub mod hdlc {
    /// HDLC flag byte (frame delimiter)
    pub const FLAG: u8 = 0x7E;
    /// HDLC escape byte
    pub const ESC: u8 = 0x7D;
    /// XOR mask for escaped bytes
    pub const ESC_XOR: u8 = 0x20;
    /// Sum of all unescaped bytes of a good frame, checksum included
    pub const GOOD_CHKSUM: u8 = 0xFF;
}

/// Build information reported in the target info record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildStamp {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub day: u8,
    pub month: u8,
    /// Year modulo 100
    pub year: u8,
}

impl BuildStamp {
    /// Parse `"Mmm dd yyyy"` and `"hh:mm:ss"` build strings.
    pub fn parse(date: &str, time: &str) -> Option<Self> {
        let d = date.as_bytes();
        let t = time.as_bytes();
        if d.len() != 11 || t.len() != 8 {
            return None;
        }

        let month = match &d[0..3] {
            b"Jan" => 1,
            b"Feb" => 2,
            b"Mar" => 3,
            b"Apr" => 4,
            b"May" => 5,
            b"Jun" => 6,
            b"Jul" => 7,
            b"Aug" => 8,
            b"Sep" => 9,
            b"Oct" => 10,
            b"Nov" => 11,
            b"Dec" => 12,
            _ => return None,
        };

        Some(Self {
            hour: two_digits(t[0], t[1])?,
            minute: two_digits(t[3], t[4])?,
            second: two_digits(t[6], t[7])?,
            day: two_digits(d[4], d[5])?,
            month,
            year: two_digits(d[9], d[10])?,
        })
    }
}

// A leading blank counts as zero, as in " 7".
fn two_digits(hi: u8, lo: u8) -> Option<u8> {
    let digit = |b: u8| match b {
        b'0'..=b'9' => Some(b - b'0'),
        _ => None,
    };
    let hi = if hi == b' ' { 0 } else { digit(hi)? };
    Some(hi * 10 + digit(lo)?)
}

/// Target description sent in a `QS_TARGET_INFO` record.
///
/// Field sizes that the buffer knows itself (signal, pointers, time) are
/// taken from its [`QSConfig`]; the rest describe the surrounding
/// framework and default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetInfo {
    pub is_reset: bool,
    pub version: u16,
    pub event_size: u8,
    pub equeue_ctr_size: u8,
    pub time_evt_ctr_size: u8,
    pub mpool_size_size: u8,
    pub mpool_ctr_size: u8,
    pub max_active: u8,
    pub max_event_pools: u8,
    pub max_tick_rate: u8,
    pub build: BuildStamp,
}

impl TargetInfo {
    /// Target info for the given version number, all limits zero
    pub fn new(version: u16) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }
}

/// QS buffer for collecting trace data
pub struct QSBuffer<const N: usize> {
    /// Ring buffer storage
    data: [u8; N],
    /// Write index (head)
    head: usize,
    /// Read index (tail)
    tail: usize,
    /// Number of bytes in buffer
    used: usize,
    /// Sequence number of the last record
    seq: u8,
    /// Running checksum of the open record
    chksum: u8,
    /// Global filter (one bit per record id)
    glb_filter: u128,
    /// Only trace state machine records of this object
    sm_obj_filter: Option<usize>,
    /// Configuration
    config: QSConfig,
    /// Application time source
    time_source: Option<fn() -> u32>,
    /// Fallback timestamp counter
    tick: u32,
}

impl<const N: usize> QSBuffer<N> {
    const CAPACITY_OK: () = assert!(N > 8, "QS buffer must hold more than 8 bytes");

    /// Create new QS buffer
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            data: [0; N],
            head: 0,
            tail: 0,
            used: 0,
            seq: 0,
            chksum: 0,
            glb_filter: 0,
            sm_obj_filter: None,
            config: QSConfig::DEFAULT,
            time_source: None,
            tick: 0,
        }
    }

    /// Reset all counters and filters, then emit the bootstrap records
    ///
    /// The `QS_EMPTY` and `QS_QP_RESET` records let a host parser
    /// resynchronize on a fresh stream.
    pub fn init(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.used = 0;
        self.seq = 0;
        self.chksum = 0;
        self.glb_filter = 0;
        self.sm_obj_filter = None;
        self.tick = 0;

        self.begin_rec(QSRecordType::QS_EMPTY as u8);
        self.end_rec();
        self.begin_rec(QSRecordType::QS_QP_RESET as u8);
        self.end_rec();

        log::debug!("QS buffer initialized, capacity {} bytes", N);
    }

    /// Set configuration
    pub fn set_config(&mut self, config: QSConfig) {
        self.config = config;
    }

    /// Get configuration
    pub fn config(&self) -> &QSConfig {
        &self.config
    }

    /// Install the function that supplies timestamps
    pub fn set_time_source(&mut self, source: fn() -> u32) {
        self.time_source = Some(source);
    }

    // ------------------------------------------------------------------
    // Filters

    /// Enable the selected records
    pub fn filter_on(&mut self, filter: QSFilter) {
        self.glb_filter |= filter.mask();
    }

    /// Disable the selected records
    pub fn filter_off(&mut self, filter: QSFilter) {
        self.glb_filter &= !filter.mask();
    }

    /// Check whether a record id passes the global filter
    pub fn is_enabled(&self, id: u8) -> bool {
        id < 128 && (self.glb_filter & (1u128 << id)) != 0
    }

    /// Limit state machine records to one object, `None` traces all
    pub fn set_sm_obj_filter(&mut self, obj: Option<usize>) {
        self.sm_obj_filter = obj;
    }

    fn passes_filters(&self, rec: QSRecordType, obj: usize) -> bool {
        if rec.is_non_maskable() {
            return true;
        }
        if !self.is_enabled(rec as u8) {
            return false;
        }
        match self.sm_obj_filter {
            Some(filter) if rec.is_sm_record() => filter == obj,
            _ => true,
        }
    }

    // ------------------------------------------------------------------
    // Record framing

    /// Begin a predefined record for `obj` if it passes the filters
    pub fn begin(&mut self, rec: QSRecordType, obj: usize) -> bool {
        if !self.passes_filters(rec, obj) {
            return false;
        }
        self.begin_rec(rec as u8);
        true
    }

    /// Begin an application record `QS_USER + offset` if it is enabled
    pub fn begin_user(&mut self, offset: u8) -> bool {
        let id = (QSRecordType::QS_USER as u8).saturating_add(offset);
        if id > QSRecordType::USER_LAST || !self.is_enabled(id) {
            return false;
        }
        self.begin_rec(id);
        true
    }

    /// Close the open record
    pub fn end(&mut self) {
        self.end_rec();
    }

    fn begin_rec(&mut self, rec: u8) {
        self.seq = self.seq.wrapping_add(1);
        self.chksum = 0;
        self.insert_esc(self.seq);

        // record ids never collide with FLAG or ESC
        self.chksum = self.chksum.wrapping_add(rec);
        self.insert(rec);
    }

    fn end_rec(&mut self) {
        let b = !self.chksum;
        if b != hdlc::FLAG && b != hdlc::ESC {
            self.insert(b);
        } else {
            self.insert(hdlc::ESC);
            self.insert(b ^ hdlc::ESC_XOR);
        }
        self.insert(hdlc::FLAG);

        if self.used > N {
            self.used = N;
            self.tail = self.head;
        }
    }

    #[inline]
    fn insert(&mut self, b: u8) {
        self.data[self.head] = b;
        self.head += 1;
        if self.head == N {
            self.head = 0;
        }
        self.used += 1;
    }

    #[inline]
    fn insert_esc(&mut self, b: u8) {
        self.chksum = self.chksum.wrapping_add(b);
        if b != hdlc::FLAG && b != hdlc::ESC {
            self.insert(b);
        } else {
            self.insert(hdlc::ESC);
            self.insert(b ^ hdlc::ESC_XOR);
        }
    }

    // ------------------------------------------------------------------
    // Raw encoders used by predefined records

    /// Add u8 to current record
    pub fn u8(&mut self, value: u8) {
        self.insert_esc(value);
    }

    /// Add i8 to current record
    pub fn i8(&mut self, value: i8) {
        self.u8(value as u8);
    }

    /// Add u16 to current record
    pub fn u16(&mut self, value: u16) {
        for byte in value.to_le_bytes() {
            self.insert_esc(byte);
        }
    }

    /// Add i16 to current record
    pub fn i16(&mut self, value: i16) {
        self.u16(value as u16);
    }

    /// Add u32 to current record
    pub fn u32(&mut self, value: u32) {
        for byte in value.to_le_bytes() {
            self.insert_esc(byte);
        }
    }

    /// Add i32 to current record
    pub fn i32(&mut self, value: i32) {
        self.u32(value as u32);
    }

    /// Add u64 to current record
    pub fn u64(&mut self, value: u64) {
        for byte in value.to_le_bytes() {
            self.insert_esc(byte);
        }
    }

    /// Add i64 to current record
    pub fn i64(&mut self, value: i64) {
        self.u64(value as u64);
    }

    /// Add f32 to current record
    pub fn f32(&mut self, value: f32) {
        self.u32(value.to_bits());
    }

    /// Add f64 to current record
    pub fn f64(&mut self, value: f64) {
        self.u64(value.to_bits());
    }

    /// Add string to current record (zero-terminated)
    pub fn str(&mut self, value: &str) {
        for &byte in value.as_bytes() {
            self.insert_esc(byte);
        }
        self.insert_esc(0);
    }

    /// Add memory block to current record, at most 255 bytes
    pub fn mem(&mut self, data: &[u8]) {
        let len = data.len().min(u8::MAX as usize);
        self.insert_esc(len as u8);
        for &byte in &data[..len] {
            self.insert_esc(byte);
        }
    }

    /// Add object pointer (configured size)
    pub fn obj(&mut self, ptr: usize) {
        self.sized_ptr(self.config.obj_ptr_size, ptr);
    }

    /// Add function pointer (configured size)
    pub fn fun(&mut self, ptr: usize) {
        self.sized_ptr(self.config.fun_ptr_size, ptr);
    }

    /// Add signal (configured size)
    pub fn sig(&mut self, sig: u16) {
        match self.config.signal_size {
            1 => self.u8(sig as u8),
            4 => self.u32(u32::from(sig)),
            _ => self.u16(sig),
        }
    }

    /// Add a timestamp (configured size, nothing when disabled)
    pub fn time(&mut self) {
        if self.config.time_size == 0 {
            return;
        }
        let now = match self.time_source {
            Some(source) => source(),
            None => {
                self.tick = self.tick.wrapping_add(1);
                self.tick
            }
        };
        match self.config.time_size {
            1 => self.u8(now as u8),
            2 => self.u16(now as u16),
            _ => self.u32(now),
        }
    }

    fn sized_ptr(&mut self, size: u8, ptr: usize) {
        match size {
            2 => self.u16(ptr as u16),
            8 => self.u64(ptr as u64),
            _ => self.u32(ptr as u32),
        }
    }

    // ------------------------------------------------------------------
    // Formatted encoders used by application records

    fn fmt(&mut self, data_type: u8, width: u8) {
        self.insert_esc(FormatByte::new(data_type, width).0);
    }

    /// Add a formatted u8
    pub fn fmt_u8(&mut self, width: u8, value: u8) {
        self.fmt(FormatByte::U8, width);
        self.u8(value);
    }

    /// Add a formatted i8
    pub fn fmt_i8(&mut self, width: u8, value: i8) {
        self.fmt(FormatByte::I8, width);
        self.i8(value);
    }

    /// Add a formatted u16
    pub fn fmt_u16(&mut self, width: u8, value: u16) {
        self.fmt(FormatByte::U16, width);
        self.u16(value);
    }

    /// Add a formatted i16
    pub fn fmt_i16(&mut self, width: u8, value: i16) {
        self.fmt(FormatByte::I16, width);
        self.i16(value);
    }

    /// Add a formatted u32
    pub fn fmt_u32(&mut self, width: u8, value: u32) {
        self.fmt(FormatByte::U32, width);
        self.u32(value);
    }

    /// Add a formatted i32
    pub fn fmt_i32(&mut self, width: u8, value: i32) {
        self.fmt(FormatByte::I32, width);
        self.i32(value);
    }

    /// Add a formatted u64
    pub fn fmt_u64(&mut self, width: u8, value: u64) {
        self.fmt(FormatByte::U64, width);
        self.u64(value);
    }

    /// Add a formatted i64
    pub fn fmt_i64(&mut self, width: u8, value: i64) {
        self.fmt(FormatByte::I64, width);
        self.i64(value);
    }

    /// Add a formatted f32
    pub fn fmt_f32(&mut self, width: u8, value: f32) {
        self.fmt(FormatByte::F32, width);
        self.f32(value);
    }

    /// Add a formatted f64
    pub fn fmt_f64(&mut self, width: u8, value: f64) {
        self.fmt(FormatByte::F64, width);
        self.f64(value);
    }

    /// Add a formatted string
    pub fn fmt_str(&mut self, value: &str) {
        self.fmt(FormatByte::STR, 0);
        self.str(value);
    }

    /// Add a formatted memory block
    pub fn fmt_mem(&mut self, data: &[u8]) {
        self.fmt(FormatByte::MEM, 0);
        self.mem(data);
    }

    /// Add a formatted signal together with its state machine object
    pub fn fmt_sig(&mut self, sig: u16, obj: usize) {
        self.fmt(FormatByte::SIG, 0);
        self.sig(sig);
        self.obj(obj);
    }

    /// Add a formatted object pointer
    pub fn fmt_obj(&mut self, obj: usize) {
        self.fmt(FormatByte::OBJ, 0);
        self.obj(obj);
    }

    /// Add a formatted function pointer
    pub fn fmt_fun(&mut self, fun: usize) {
        self.fmt(FormatByte::FUN, 0);
        self.fun(fun);
    }

    // ------------------------------------------------------------------
    // Dictionaries and target info (never filtered)

    /// Emit a signal dictionary entry, `obj` 0 for global signals
    pub fn sig_dict(&mut self, sig: u16, obj: usize, name: &str) {
        self.begin_rec(QSRecordType::QS_SIG_DICT as u8);
        self.sig(sig);
        self.obj(obj);
        self.str(dict_name(name));
        self.end_rec();
    }

    /// Emit an object dictionary entry
    pub fn obj_dict(&mut self, obj: usize, name: &str) {
        self.begin_rec(QSRecordType::QS_OBJ_DICT as u8);
        self.obj(obj);
        self.str(dict_name(name));
        self.end_rec();
    }

    /// Emit a function dictionary entry
    pub fn fun_dict(&mut self, fun: usize, name: &str) {
        self.begin_rec(QSRecordType::QS_FUN_DICT as u8);
        self.fun(fun);
        self.str(dict_name(name));
        self.end_rec();
    }

    /// Emit a user record dictionary entry
    pub fn usr_dict(&mut self, rec: u8, name: &str) {
        self.begin_rec(QSRecordType::QS_USR_DICT as u8);
        self.u8(rec);
        self.str(name);
        self.end_rec();
    }

    /// Emit the `QS_TARGET_INFO` record
    pub fn target_info(&mut self, info: &TargetInfo) {
        let cfg = self.config;
        self.begin_rec(QSRecordType::QS_TARGET_INFO as u8);
        self.u8(if info.is_reset { 0xFF } else { 0 });
        self.u16(info.version);
        self.u8(cfg.signal_size | (info.event_size << 4));
        self.u8(info.equeue_ctr_size | (info.time_evt_ctr_size << 4));
        self.u8(info.mpool_size_size | (info.mpool_ctr_size << 4));
        self.u8(cfg.obj_ptr_size | (cfg.fun_ptr_size << 4));
        self.u8(cfg.time_size);
        self.u8(info.max_active);
        self.u8(info.max_event_pools | (info.max_tick_rate << 4));
        self.u8(info.build.second);
        self.u8(info.build.minute);
        self.u8(info.build.hour);
        self.u8(info.build.day);
        self.u8(info.build.month);
        self.u8(info.build.year);
        self.end_rec();
    }

    // ------------------------------------------------------------------
    // Consumer side

    /// Take the oldest byte, `None` once the buffer is drained
    pub fn get_byte(&mut self) -> Option<u8> {
        if self.used == 0 {
            return None;
        }
        let b = self.data[self.tail];
        self.tail += 1;
        if self.tail == N {
            self.tail = 0;
        }
        self.used -= 1;
        Some(b)
    }

    /// Take up to `max` contiguous bytes
    ///
    /// The block never spans the end of the storage; call again for the
    /// part that wrapped around. `None` means the buffer is empty.
    pub fn get_block(&mut self, max: usize) -> Option<&[u8]> {
        if self.used == 0 {
            return None;
        }
        let tail = self.tail;
        let n = (N - tail).min(self.used).min(max);

        self.used -= n;
        self.tail += n;
        if self.tail == N {
            self.tail = 0;
        }
        Some(&self.data[tail..tail + n])
    }

    /// Read available bytes from buffer
    /// Returns the number of bytes read
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            match self.get_block(buf.len() - n) {
                Some(block) if !block.is_empty() => {
                    let len = block.len();
                    buf[n..n + len].copy_from_slice(block);
                    n += len;
                }
                _ => break,
            }
        }
        n
    }

    /// Number of bytes waiting to be read
    pub fn used(&self) -> usize {
        self.used
    }

    /// Write position
    pub fn head(&self) -> usize {
        self.head
    }

    /// Read position
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Storage size in bytes
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for QSBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

// Dictionary names are usually produced with `stringify!(&obj)`.
fn dict_name(name: &str) -> &str {
    name.trim_start_matches('&').trim_start()
}
