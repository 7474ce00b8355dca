//! State handler contract for the QP framework
//!
//! A state is a plain function. Its identity is the function's address,
//! so two handlers are the same state exactly when they are the same
//! function. Handlers receive the application object mutably and the
//! current event read-only, and report what they did through
//! [`QStateReturn`].
//!
//! Optimized builds fold functions whose machine code is identical into
//! one. Two pass-through states that only name the same superstate would
//! then share an address and become one state. Such handlers must start
//! with [`q_state_tag!`](crate::q_state_tag), which gives every handler
//! a body of its own:
//!
//! ```
//! use qp_core::{q_state_tag, super_state, QEvent, QStateReturn};
//!
//! struct Menu;
//!
//! fn menu(_me: &mut Menu, _e: &dyn QEvent) -> QStateReturn<Menu> {
//!     QStateReturn::Ignored
//! }
//!
//! fn item_a(_me: &mut Menu, _e: &dyn QEvent) -> QStateReturn<Menu> {
//!     q_state_tag!();
//!     super_state(menu)
//! }
//!
//! fn item_b(_me: &mut Menu, _e: &dyn QEvent) -> QStateReturn<Menu> {
//!     q_state_tag!();
//!     super_state(menu)
//! }
//! # assert!(!qp_core::same_state::<Menu>(item_a, item_b));
//! ```

use core::fmt;

use crate::QEvent;

/// State handler function pointer type
pub type QStateHandler<M> = fn(&mut M, &dyn QEvent) -> QStateReturn<M>;

/// State machine return codes
pub enum QStateReturn<M> {
    /// Event was handled in this state
    Handled,
    /// A guard failed; the event may still be handled by a superstate
    Unhandled,
    /// Event was deliberately ignored (only the top state returns this)
    Ignored,
    /// Event not handled here, this is the superstate
    Super(QStateHandler<M>),
    /// Transition to a new state
    Transition(QStateHandler<M>),
    /// Transition to the history of a composite state
    TranHist(QStateHandler<M>),
}

impl<M> QStateReturn<M> {
    /// Check if the event was consumed by this state
    pub fn is_handled(&self) -> bool {
        matches!(
            self,
            QStateReturn::Handled | QStateReturn::Transition(_) | QStateReturn::TranHist(_)
        )
    }

    /// Check if this is a transition
    pub fn is_transition(&self) -> bool {
        matches!(self, QStateReturn::Transition(_) | QStateReturn::TranHist(_))
    }

    /// Target carried by a `Super`, `Transition` or `TranHist` return
    pub fn target(&self) -> Option<QStateHandler<M>> {
        match *self {
            QStateReturn::Super(s) | QStateReturn::Transition(s) | QStateReturn::TranHist(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    /// Short name used in log output
    pub const fn name(&self) -> &'static str {
        match self {
            QStateReturn::Handled => "Handled",
            QStateReturn::Unhandled => "Unhandled",
            QStateReturn::Ignored => "Ignored",
            QStateReturn::Super(_) => "Super",
            QStateReturn::Transition(_) => "Transition",
            QStateReturn::TranHist(_) => "TranHist",
        }
    }
}

impl<M> Clone for QStateReturn<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for QStateReturn<M> {}

impl<M> PartialEq for QStateReturn<M> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QStateReturn::Handled, QStateReturn::Handled)
            | (QStateReturn::Unhandled, QStateReturn::Unhandled)
            | (QStateReturn::Ignored, QStateReturn::Ignored) => true,
            (QStateReturn::Super(a), QStateReturn::Super(b))
            | (QStateReturn::Transition(a), QStateReturn::Transition(b))
            | (QStateReturn::TranHist(a), QStateReturn::TranHist(b)) => same_state(*a, *b),
            _ => false,
        }
    }
}

impl<M> Eq for QStateReturn<M> {}

impl<M> fmt::Debug for QStateReturn<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(s) => write!(f, "{}({:#x})", self.name(), state_addr(s)),
            None => f.write_str(self.name()),
        }
    }
}

#[cfg(feature = "defmt")]
impl<M> defmt::Format for QStateReturn<M> {
    fn format(&self, fmt: defmt::Formatter) {
        match self.target() {
            Some(s) => defmt::write!(fmt, "{=str}({=usize:#x})", self.name(), state_addr(s)),
            None => defmt::write!(fmt, "{=str}", self.name()),
        }
    }
}

/// Address of a state handler, used as its identity and in trace records
#[inline]
pub fn state_addr<M>(state: QStateHandler<M>) -> usize {
    state as usize
}

/// Compare two state handlers by identity
///
/// Handlers with identical bodies compare equal in optimized builds
/// unless they carry a [`q_state_tag!`](crate::q_state_tag).
#[inline]
pub fn same_state<M>(a: QStateHandler<M>, b: QStateHandler<M>) -> bool {
    state_addr(a) == state_addr(b)
}

/// Gives the enclosing state handler an address no other handler shares.
///
/// Every expansion owns a distinct static that the handler reads, so no
/// two tagged handlers have identical code.
#[macro_export]
macro_rules! q_state_tag {
    () => {{
        static TAG: u8 = 0;
        let _ = ::core::hint::black_box(&TAG);
    }};
}

/// Convenient return values for state handlers
pub const fn handled<M>() -> QStateReturn<M> {
    QStateReturn::Handled
}

/// Report a failed guard
pub const fn unhandled<M>() -> QStateReturn<M> {
    QStateReturn::Unhandled
}

/// Create a transition return value
pub const fn transition<M>(target: QStateHandler<M>) -> QStateReturn<M> {
    QStateReturn::Transition(target)
}

/// Create a super state return value
pub const fn super_state<M>(parent: QStateHandler<M>) -> QStateReturn<M> {
    QStateReturn::Super(parent)
}

/// Create a transition-to-history return value
pub const fn tran_hist<M>(hist: QStateHandler<M>) -> QStateReturn<M> {
    QStateReturn::TranHist(hist)
}
