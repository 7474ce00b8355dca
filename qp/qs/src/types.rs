//! QS Type Definitions
//!
//! Record identifiers, field-size configuration, format bytes and record
//! filters used by the QS trace buffer.

/// Predefined QS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum QSRecordType {
    // [0] QS session (not maskable)
    QS_EMPTY = 0,

    // [1-9] SM records
    QS_QEP_STATE_ENTRY = 1,
    QS_QEP_STATE_EXIT = 2,
    QS_QEP_STATE_INIT = 3,
    QS_QEP_INIT_TRAN = 4,
    QS_QEP_INTERN_TRAN = 5,
    QS_QEP_TRAN = 6,
    QS_QEP_IGNORED = 7,
    QS_QEP_DISPATCH = 8,
    QS_QEP_UNHANDLED = 9,

    // [55] Additional QEP records
    QS_QEP_TRAN_HIST = 55,

    // [60-64] Miscellaneous QS records (not maskable)
    QS_SIG_DICT = 60,
    QS_OBJ_DICT = 61,
    QS_FUN_DICT = 62,
    QS_USR_DICT = 63,
    QS_TARGET_INFO = 64,

    // User Records (100+)
    QS_USER = 100,

    // [127] Bootstrap marker emitted by buffer init only
    QS_QP_RESET = 0x7F,
}

impl QSRecordType {
    /// Last record id available to the application
    pub const USER_LAST: u8 = 124;

    /// Get the record type name
    pub const fn name(self) -> &'static str {
        match self {
            Self::QS_EMPTY => "QS_EMPTY",
            Self::QS_QEP_STATE_ENTRY => "QS_QEP_STATE_ENTRY",
            Self::QS_QEP_STATE_EXIT => "QS_QEP_STATE_EXIT",
            Self::QS_QEP_STATE_INIT => "QS_QEP_STATE_INIT",
            Self::QS_QEP_INIT_TRAN => "QS_QEP_INIT_TRAN",
            Self::QS_QEP_INTERN_TRAN => "QS_QEP_INTERN_TRAN",
            Self::QS_QEP_TRAN => "QS_QEP_TRAN",
            Self::QS_QEP_IGNORED => "QS_QEP_IGNORED",
            Self::QS_QEP_DISPATCH => "QS_QEP_DISPATCH",
            Self::QS_QEP_UNHANDLED => "QS_QEP_UNHANDLED",
            Self::QS_QEP_TRAN_HIST => "QS_QEP_TRAN_HIST",
            Self::QS_SIG_DICT => "QS_SIG_DICT",
            Self::QS_OBJ_DICT => "QS_OBJ_DICT",
            Self::QS_FUN_DICT => "QS_FUN_DICT",
            Self::QS_USR_DICT => "QS_USR_DICT",
            Self::QS_TARGET_INFO => "QS_TARGET_INFO",
            Self::QS_USER => "QS_USER",
            Self::QS_QP_RESET => "QS_QP_RESET",
        }
    }

    /// Check if record is non-maskable (always passes filters)
    pub const fn is_non_maskable(self) -> bool {
        matches!(
            self,
            Self::QS_SIG_DICT
                | Self::QS_OBJ_DICT
                | Self::QS_FUN_DICT
                | Self::QS_USR_DICT
                | Self::QS_TARGET_INFO
                | Self::QS_EMPTY
                | Self::QS_QP_RESET
        )
    }

    /// Check if record is subject to the state-machine object filter
    pub const fn is_sm_record(self) -> bool {
        matches!(self as u8, 1..=9) || matches!(self, Self::QS_QEP_TRAN_HIST)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QSRecordType {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.name());
    }
}

/// Sizes of variable-width record fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QSConfig {
    /// Timestamp size in bytes (1, 2 or 4; 0 omits timestamps)
    pub time_size: u8,
    /// Signal size in bytes (1, 2, or 4)
    pub signal_size: u8,
    /// Object pointer size in bytes (2, 4, or 8)
    pub obj_ptr_size: u8,
    /// Function pointer size in bytes (2, 4, or 8)
    pub fun_ptr_size: u8,
}

impl QSConfig {
    /// Configuration used by a freshly created buffer
    pub const DEFAULT: QSConfig = QSConfig {
        time_size: 4,
        signal_size: 2,
        obj_ptr_size: core::mem::size_of::<usize>() as u8,
        fun_ptr_size: core::mem::size_of::<usize>() as u8,
    };

    /// Creates a new configuration builder.
    pub fn builder() -> QSConfigBuilder {
        QSConfigBuilder::default()
    }
}

impl Default for QSConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builder for [`QSConfig`]
#[derive(Debug, Clone)]
pub struct QSConfigBuilder {
    config: QSConfig,
}

impl Default for QSConfigBuilder {
    fn default() -> Self {
        Self {
            config: QSConfig::DEFAULT,
        }
    }
}

impl QSConfigBuilder {
    /// Sets the timestamp size, 0 disables timestamps.
    pub fn time_size(mut self, size: u8) -> Self {
        self.config.time_size = size;
        self
    }

    /// Sets the signal size.
    pub fn signal_size(mut self, size: u8) -> Self {
        self.config.signal_size = size;
        self
    }

    /// Sets the object and function pointer sizes.
    pub fn pointer_sizes(mut self, obj: u8, fun: u8) -> Self {
        self.config.obj_ptr_size = obj;
        self.config.fun_ptr_size = fun;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> QSConfig {
        self.config
    }
}

/// Format byte for application-specific records
/// Lower nibble: data type (0-15)
/// Upper nibble: format width (0-15 digits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatByte(pub u8);

impl FormatByte {
    /// Data types for format byte (lower nibble)
    pub const I8: u8 = 0;
    pub const U8: u8 = 1;
    pub const I16: u8 = 2;
    pub const U16: u8 = 3;
    pub const I32: u8 = 4;
    pub const U32: u8 = 5;
    pub const F32: u8 = 6;
    pub const F64: u8 = 7;
    pub const STR: u8 = 8;
    pub const MEM: u8 = 9;
    pub const SIG: u8 = 10;
    pub const OBJ: u8 = 11;
    pub const FUN: u8 = 12;
    pub const I64: u8 = 13;
    pub const U64: u8 = 14;

    /// Create format byte from type and width
    pub const fn new(data_type: u8, width: u8) -> Self {
        Self((width << 4) | (data_type & 0x0F))
    }

    /// Get data type (lower nibble)
    pub const fn data_type(self) -> u8 {
        self.0 & 0x0F
    }

    /// Get format width (upper nibble)
    pub const fn width(self) -> u8 {
        self.0 >> 4
    }
}

/// Record selection for `filter_on` / `filter_off`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QSFilter {
    /// Every maskable record
    All,
    /// State machine records (1-9 and transition to history)
    SmRecords,
    /// All user records (`QS_USER`..=124)
    UserRecords,
    /// One predefined record type
    Record(QSRecordType),
    /// One record id, predefined or user
    Id(u8),
}

impl QSFilter {
    /// Bit mask of the record ids this filter selects
    pub const fn mask(self) -> u128 {
        match self {
            QSFilter::All => filters::ALL_RECORDS,
            QSFilter::SmRecords => filters::SM_RECORDS,
            QSFilter::UserRecords => filters::UA_RECORDS,
            QSFilter::Record(rec) => filters::bit(rec as u8),
            QSFilter::Id(id) => filters::bit(id),
        }
    }
}

/// Record group masks
pub mod filters {
    /// All maskable records; ids 0x7D..=0x7F are never enabled
    pub const ALL_RECORDS: u128 = u128::MAX >> 3;

    /// State Machine records group
    pub const SM_RECORDS: u128 = 0x3FE | (1 << 55); // Bits 1-9 and 55

    /// All user records (QS_USER+0 to QS_USER+24)
    pub const UA_RECORDS: u128 = 0x1FF_FFFF << 100;

    /// Mask with the bit of one record id set
    pub const fn bit(id: u8) -> u128 {
        if id < 128 {
            (1u128 << id) & ALL_RECORDS
        } else {
            0
        }
    }
}
