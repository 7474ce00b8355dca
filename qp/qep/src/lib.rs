#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # QP Event Processor (QEP)
//!
//! Run-to-completion state machine engines implementing UML statecharts:
//!
//! - [`QFsm`]: flat machines, one level of states below an implicit top
//! - [`QHsm`]: hierarchical machines whose states report their superstate
//!   when asked with the reserved `EMPTY` signal
//! - [`QMsm`]: table-driven hierarchical machines built from static
//!   [`QMState`] descriptors and precomputed transition-action tables
//!
//! Every engine call takes the application object the handlers act on and
//! a [`QSpy`] sink for trace records. Pass [`qp_qs::QSDummy`] to disable
//! tracing.
//!
//! ```rust
//! use qp_core::{handled, super_state, transition, QEvent, QSignal, QStateReturn};
//! use qp_qep::{QHsm, QStateMachine};
//! use qp_qs::QSDummy;
//!
//! const TOGGLE: QSignal = QSignal::USER;
//!
//! #[derive(Default)]
//! struct Lamp {
//!     lit: bool,
//! }
//!
//! fn initial(_me: &mut Lamp, _e: &dyn QEvent) -> QStateReturn<Lamp> {
//!     transition(off)
//! }
//!
//! fn off(me: &mut Lamp, e: &dyn QEvent) -> QStateReturn<Lamp> {
//!     match e.signal() {
//!         QSignal::ENTRY => {
//!             me.lit = false;
//!             handled()
//!         }
//!         TOGGLE => transition(on),
//!         _ => super_state(QHsm::top),
//!     }
//! }
//!
//! fn on(me: &mut Lamp, e: &dyn QEvent) -> QStateReturn<Lamp> {
//!     match e.signal() {
//!         QSignal::ENTRY => {
//!             me.lit = true;
//!             handled()
//!         }
//!         TOGGLE => transition(off),
//!         _ => super_state(QHsm::top),
//!     }
//! }
//!
//! let mut lamp = Lamp::default();
//! let mut hsm = QHsm::new(initial);
//! hsm.init(&mut lamp, &qp_qep::INIT_EVT, &mut QSDummy).unwrap();
//!
//! hsm.dispatch(&mut lamp, &qp_core::QStaticEvent::new(TOGGLE), &mut QSDummy).unwrap();
//! assert!(lamp.lit);
//! ```

use qp_core::{QEvent, QResult, QSignal, QStaticEvent};
use qp_qs::QSpy;

mod fsm;
mod hsm;
mod msm;
mod transition;

pub use fsm::QFsm;
pub use hsm::QHsm;
pub use msm::{
    QActionHandler, QMActionReturn, QMState, QMStateHandler, QMStateReturn, QMTranActTable, QMsm,
};
pub use transition::QPath;

#[cfg(test)]
mod tests;

/// Maximum nesting depth of a hierarchical state machine
pub const MAX_NEST_DEPTH: usize = 6;

/// Maximum number of entry actions on a table-driven history entry path
pub const MAX_ENTRY_DEPTH: usize = 4;

/// Reserved event used to ask a state for its superstate
pub const EMPTY_EVT: QStaticEvent = QStaticEvent::new(QSignal::EMPTY);
/// Reserved event that triggers entry actions
pub const ENTRY_EVT: QStaticEvent = QStaticEvent::new(QSignal::ENTRY);
/// Reserved event that triggers exit actions
pub const EXIT_EVT: QStaticEvent = QStaticEvent::new(QSignal::EXIT);
/// Reserved event that triggers nested initial transitions
pub const INIT_EVT: QStaticEvent = QStaticEvent::new(QSignal::INIT);

/// Common interface of the three engines.
///
/// `M` is the application object every state handler receives. Both
/// calls are one run-to-completion step: they return only after the
/// machine reached a stable configuration again, or with the fault that
/// prevented it.
pub trait QStateMachine<M> {
    /// Take the top-most initial transition and drill into the leaf
    fn init(&mut self, me: &mut M, e: &dyn QEvent, qs: &mut dyn QSpy) -> QResult<()>;

    /// Process one event
    fn dispatch(&mut self, me: &mut M, e: &dyn QEvent, qs: &mut dyn QSpy) -> QResult<()>;

    /// `true` between complete steps of an initialized machine
    fn is_stable(&self) -> bool;
}

/// Identity of the application object in trace records and filters
#[inline]
pub(crate) fn obj_addr<M>(me: &M) -> usize {
    me as *const M as usize
}
