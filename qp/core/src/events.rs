//! Event types and signal definitions for the QP framework

use core::any::Any;
use core::fmt;

/// Type-safe event signal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QSignal(pub u16);

impl QSignal {
    /// Reserved signal used to ask a state for its superstate
    pub const EMPTY: QSignal = QSignal(0);
    /// Reserved signal for state entry actions
    pub const ENTRY: QSignal = QSignal(1);
    /// Reserved signal for state exit actions
    pub const EXIT: QSignal = QSignal(2);
    /// Reserved signal for nested initial transitions
    pub const INIT: QSignal = QSignal(3);

    /// First user-defined signal
    pub const USER: QSignal = QSignal(4);

    /// Create a new signal from a raw value
    pub const fn new(signal: u16) -> Self {
        QSignal(signal)
    }

    /// Get the raw signal value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Check if this is one of the four reserved engine signals
    pub const fn is_reserved(self) -> bool {
        self.0 < QSignal::USER.0
    }
}

impl From<u16> for QSignal {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for QSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            QSignal::EMPTY => write!(f, "EMPTY"),
            QSignal::ENTRY => write!(f, "ENTRY"),
            QSignal::EXIT => write!(f, "EXIT"),
            QSignal::INIT => write!(f, "INIT"),
            QSignal(sig) => write!(f, "QSignal({})", sig),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for QSignal {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "QSignal({})", self.0);
    }
}

/// Base trait for all events in the QP framework
///
/// Events are read-only for the whole run-to-completion step that
/// processes them.
pub trait QEvent: Send + Sync + 'static {
    /// Get the signal identifier for this event
    fn signal(&self) -> QSignal;

    /// Pool the event was allocated from, zero for static events
    fn pool_id(&self) -> u8 {
        0
    }

    /// Type-erased view used to recover the concrete event type
    fn as_any(&self) -> &dyn Any;

    /// Check if this is a reserved framework event
    fn is_reserved(&self) -> bool {
        self.signal().is_reserved()
    }
}

impl dyn QEvent {
    /// Recover the concrete event type, if it matches `T`
    pub fn downcast_ref<T: QEvent>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Static event that carries no data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QStaticEvent {
    pub signal: QSignal,
}

impl QStaticEvent {
    /// Create a new static event
    pub const fn new(signal: QSignal) -> Self {
        Self { signal }
    }
}

impl QEvent for QStaticEvent {
    fn signal(&self) -> QSignal {
        self.signal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Dynamic event that carries a typed payload
pub struct QDynamicEvent<T> {
    pub signal: QSignal,
    pub pool_id: u8,
    pub data: T,
}

impl<T> QDynamicEvent<T> {
    /// Create a new event with data, not owned by any pool
    pub const fn new(signal: QSignal, data: T) -> Self {
        Self {
            signal,
            pool_id: 0,
            data,
        }
    }

    /// Mark the event as allocated from the given pool
    pub fn with_pool(mut self, pool_id: u8) -> Self {
        self.pool_id = pool_id;
        self
    }
}

impl<T: Send + Sync + 'static> QEvent for QDynamicEvent<T> {
    fn signal(&self) -> QSignal {
        self.signal
    }

    fn pool_id(&self) -> u8 {
        self.pool_id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for QDynamicEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QDynamicEvent")
            .field("signal", &self.signal)
            .field("pool_id", &self.pool_id)
            .field("data", &self.data)
            .finish()
    }
}

/// Macro to define custom event enums that implement QEvent
#[macro_export]
macro_rules! define_events {
    (
        $vis:vis enum $name:ident {
            $(
                $variant:ident $(($data:ty))? = $signal:expr
            ),* $(,)?
        }
    ) => {
        #[derive(Debug)]
        $vis enum $name {
            $(
                $variant $(($data))?,
            )*
        }

        impl $crate::QEvent for $name {
            fn signal(&self) -> $crate::QSignal {
                match self {
                    $(
                        $name::$variant { .. } => $crate::QSignal($signal),
                    )*
                }
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }
    };
}
