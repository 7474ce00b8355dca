//! Table-driven hierarchical state machine engine
//!
//! The state tree is described by static [`QMState`] descriptors, so the
//! parent of a state is a field access. Transitions carry a precomputed
//! [`QMTranActTable`] listing the exit, transition, entry and initial
//! actions to run in order; the engine never searches for a least common
//! ancestor.
//!
//! ```rust
//! use qp_core::{QEvent, QSignal, QStaticEvent};
//! use qp_qep::{QMActionReturn, QMState, QMStateReturn, QMTranActTable, QMsm, QStateMachine};
//! use qp_qs::QSDummy;
//!
//! const GO: QSignal = QSignal::USER;
//!
//! struct Blinky;
//!
//! static IDLE: QMState<Blinky> = QMState::new(None, idle, None, None, None);
//! static BUSY: QMState<Blinky> = QMState::new(None, busy, None, None, None);
//! static TO_IDLE: QMTranActTable<Blinky> = QMTranActTable { target: &IDLE, act: &[] };
//! static TO_BUSY: QMTranActTable<Blinky> = QMTranActTable { target: &BUSY, act: &[] };
//!
//! fn initial(_me: &mut Blinky, _e: &dyn QEvent) -> QMStateReturn<Blinky> {
//!     QMStateReturn::Transition(&TO_IDLE)
//! }
//!
//! fn idle(_me: &mut Blinky, e: &dyn QEvent) -> QMStateReturn<Blinky> {
//!     match e.signal() {
//!         GO => QMStateReturn::Transition(&TO_BUSY),
//!         _ => QMStateReturn::Super,
//!     }
//! }
//!
//! fn busy(_me: &mut Blinky, e: &dyn QEvent) -> QMStateReturn<Blinky> {
//!     match e.signal() {
//!         GO => QMStateReturn::Handled,
//!         _ => QMStateReturn::Super,
//!     }
//! }
//!
//! let mut me = Blinky;
//! let mut msm = QMsm::new(initial);
//! msm.init(&mut me, &qp_qep::INIT_EVT, &mut QSDummy).unwrap();
//! msm.dispatch(&mut me, &QStaticEvent::new(GO), &mut QSDummy).unwrap();
//! assert!(msm.is_in_state(&BUSY).unwrap());
//! ```

use core::fmt;
use core::ptr;

use qp_core::{QError, QEvent, QResult};
use qp_qs::{
    qs_ignored, qs_init_tran, qs_intern_tran, qs_sm_dispatch, qs_sm_entry, qs_sm_exit,
    qs_sm_init, qs_sm_tran, qs_tran_hist, qs_unhandled, QSpy,
};

use crate::transition::QPath;
use crate::{obj_addr, QStateMachine, MAX_ENTRY_DEPTH};

/// State handler of a table-driven machine
pub type QMStateHandler<M> = fn(&mut M, &dyn QEvent) -> QMStateReturn<M>;

/// Entry, exit, initial or transition action
pub type QActionHandler<M> = fn(&mut M) -> QMActionReturn<M>;

/// Static description of one state
pub struct QMState<M: 'static> {
    /// Enclosing state, `None` directly below the top
    pub superstate: Option<&'static QMState<M>>,
    pub state_handler: QMStateHandler<M>,
    pub entry_action: Option<QActionHandler<M>>,
    pub exit_action: Option<QActionHandler<M>>,
    /// Initial transition taken when the state is entered through history
    pub init_action: Option<QActionHandler<M>>,
}

impl<M: 'static> QMState<M> {
    pub const fn new(
        superstate: Option<&'static QMState<M>>,
        state_handler: QMStateHandler<M>,
        entry_action: Option<QActionHandler<M>>,
        exit_action: Option<QActionHandler<M>>,
        init_action: Option<QActionHandler<M>>,
    ) -> Self {
        Self {
            superstate,
            state_handler,
            entry_action,
            exit_action,
            init_action,
        }
    }

    /// Address of the state handler, used in trace records
    #[inline]
    pub fn addr(&self) -> usize {
        self.state_handler as usize
    }

    /// Identity comparison of two descriptors
    #[inline]
    pub fn same(&self, other: &QMState<M>) -> bool {
        ptr::eq(self, other)
    }
}

impl<M: 'static> fmt::Debug for QMState<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QMState({:#x})", self.addr())
    }
}

/// Transition target plus the actions that reach it
pub struct QMTranActTable<M: 'static> {
    pub target: &'static QMState<M>,
    /// Actions run in order: exits, transition actions, entries, initial
    pub act: &'static [QActionHandler<M>],
}

/// What a table-driven state handler did with an event
pub enum QMStateReturn<M: 'static> {
    /// Event consumed without a transition
    Handled,
    /// A guard failed; the superstate gets the event
    Unhandled,
    /// Not handled here; the superstate gets the event
    Super,
    /// Regular transition
    Transition(&'static QMTranActTable<M>),
    /// Transition that ends in the remembered `history` substate of the
    /// table target
    TranHist(&'static QMTranActTable<M>, &'static QMState<M>),
}

impl<M: 'static> fmt::Debug for QMStateReturn<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QMStateReturn::Handled => f.write_str("Handled"),
            QMStateReturn::Unhandled => f.write_str("Unhandled"),
            QMStateReturn::Super => f.write_str("Super"),
            QMStateReturn::Transition(tatbl) => write!(f, "Transition({:?})", tatbl.target),
            QMStateReturn::TranHist(tatbl, hist) => {
                write!(f, "TranHist({:?}, {:?})", tatbl.target, hist)
            }
        }
    }
}

/// Tag returned by every action, read by the engine for tracing and to
/// detect nested initial transitions
pub enum QMActionReturn<M: 'static> {
    /// Entry action of the given state ran
    Entry(&'static QMState<M>),
    /// Exit action of the given state ran
    Exit(&'static QMState<M>),
    /// Nested initial transition, continue with this table
    Initial(&'static QMTranActTable<M>),
    /// Plain transition action
    Null,
}

/// Table-driven hierarchical state machine
pub struct QMsm<M: 'static> {
    state: Option<&'static QMState<M>>,
    temp: Option<&'static QMState<M>>,
    initial: QMStateHandler<M>,
}

impl<M: 'static> QMsm<M> {
    /// Create a machine whose initial pseudostate is `initial`.
    ///
    /// `initial` must return [`QMStateReturn::Transition`] with the table
    /// of the top-most initial transition.
    pub const fn new(initial: QMStateHandler<M>) -> Self {
        Self {
            state: None,
            temp: None,
            initial,
        }
    }

    /// Active leaf state, `None` before `init`
    pub fn state(&self) -> Option<&'static QMState<M>> {
        self.state
    }

    /// Check if `state` is the active leaf or one of its superstates
    pub fn is_in_state(&self, state: &QMState<M>) -> QResult<bool> {
        let mut s = Some(self.stable_state()?);
        while let Some(st) = s {
            if st.same(state) {
                return Ok(true);
            }
            s = st.superstate;
        }
        Ok(false)
    }

    /// Direct child of `parent` on the active path, starting above the
    /// leaf
    pub fn child_state_obj(&self, parent: &QMState<M>) -> QResult<&'static QMState<M>> {
        let mut child = self.stable_state()?;
        let mut s = child.superstate;
        while let Some(st) = s {
            if st.same(parent) {
                return Ok(child);
            }
            child = st;
            s = st.superstate;
        }
        Err(QError::ChildNotFound)
    }

    fn stable_state(&self) -> QResult<&'static QMState<M>> {
        match (self.state, self.temp) {
            (Some(s), Some(t)) if s.same(t) => Ok(s),
            (None, None) => Err(QError::NotInitialized),
            _ => Err(QError::UnstableConfiguration),
        }
    }

    /// Run the actions of `tatbl` in order; returns the tag of the last
    /// action and the state the table leaves active
    fn exec_tatbl(
        me: &mut M,
        tatbl: &'static QMTranActTable<M>,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> (QMActionReturn<M>, &'static QMState<M>) {
        let mut r = QMActionReturn::Null;
        for act in tatbl.act {
            r = act(me);
            match r {
                QMActionReturn::Entry(s) => qs_sm_entry!(qs, obj, s.addr()),
                QMActionReturn::Exit(s) => qs_sm_exit!(qs, obj, s.addr()),
                QMActionReturn::Initial(next) => {
                    qs_sm_init!(qs, obj, tatbl.target.addr(), next.target.addr())
                }
                QMActionReturn::Null => {}
            }
        }

        let state = match r {
            QMActionReturn::Initial(next) => next.target,
            _ => tatbl.target,
        };
        (r, state)
    }

    /// Exit from the active leaf `s` up to the transition source `ts`
    fn exit_to_tran_source(
        me: &mut M,
        mut s: &'static QMState<M>,
        ts: &'static QMState<M>,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> QResult<()> {
        while !s.same(ts) {
            if let Some(exit) = s.exit_action {
                if let QMActionReturn::Exit(_) = exit(me) {
                    qs_sm_exit!(qs, obj, s.addr());
                }
            }
            s = s.superstate.ok_or(QError::InvalidTransition)?;
        }
        Ok(())
    }

    /// Enter from just below `ts` down to `hist`, then take the initial
    /// action of `hist` if it has one
    fn enter_history(
        me: &mut M,
        ts: &'static QMState<M>,
        hist: &'static QMState<M>,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> QResult<(QMActionReturn<M>, &'static QMState<M>)> {
        qs_tran_hist!(qs, obj, ts.addr(), hist.addr());

        let mut entry: QPath<&'static QMState<M>, MAX_ENTRY_DEPTH> = QPath::new();
        let mut s = hist;
        while !s.same(ts) {
            if s.entry_action.is_some() {
                entry.push(s)?;
            }
            s = s.superstate.ok_or(QError::InvalidTransition)?;
        }

        for st in entry.root_to_leaf() {
            if let Some(enter) = st.entry_action {
                enter(me);
                qs_sm_entry!(qs, obj, st.addr());
            }
        }

        let r = match hist.init_action {
            Some(init) => init(me),
            None => QMActionReturn::Null,
        };
        Ok((r, hist))
    }

    /// Run a transition found in source `ts` while `s` was the leaf
    fn transition(
        me: &mut M,
        s: &'static QMState<M>,
        ts: &'static QMState<M>,
        ret: QMStateReturn<M>,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> QResult<&'static QMState<M>> {
        let (mut r, mut leaf) = match ret {
            QMStateReturn::Transition(tatbl) => {
                Self::exit_to_tran_source(me, s, ts, obj, qs)?;
                Self::exec_tatbl(me, tatbl, obj, qs)
            }
            QMStateReturn::TranHist(tatbl, hist) => {
                Self::exit_to_tran_source(me, s, ts, obj, qs)?;
                let (_, entered) = Self::exec_tatbl(me, tatbl, obj, qs);
                Self::enter_history(me, entered, hist, obj, qs)?
            }
            _ => return Err(QError::InvalidTransition),
        };

        while let QMActionReturn::Initial(next) = r {
            (r, leaf) = Self::exec_tatbl(me, next, obj, qs);
        }
        Ok(leaf)
    }
}

impl<M: 'static> QStateMachine<M> for QMsm<M> {
    fn init(&mut self, me: &mut M, e: &dyn QEvent, qs: &mut dyn QSpy) -> QResult<()> {
        if self.state.is_some() {
            return Err(QError::AlreadyInitialized);
        }
        let obj = obj_addr(me);

        let tatbl = match (self.initial)(me, e) {
            QMStateReturn::Transition(tatbl) => tatbl,
            other => {
                log::error!("initial pseudostate returned {:?}", other);
                return Err(QError::InvalidTransition);
            }
        };

        qs_sm_init!(qs, obj, self.initial as usize, tatbl.target.addr());

        let (mut r, mut leaf) = Self::exec_tatbl(me, tatbl, obj, qs);
        while let QMActionReturn::Initial(next) = r {
            (r, leaf) = Self::exec_tatbl(me, next, obj, qs);
        }

        qs_init_tran!(qs, obj, leaf.addr());
        log::trace!("{:#x} initialized in {:?}", obj, leaf);

        self.state = Some(leaf);
        self.temp = Some(leaf);
        Ok(())
    }

    fn dispatch(&mut self, me: &mut M, e: &dyn QEvent, qs: &mut dyn QSpy) -> QResult<()> {
        let s = self.stable_state().map_err(|err| {
            log::error!("dispatch of {} rejected: {}", e.signal(), err);
            err
        })?;
        let obj = obj_addr(me);
        let sig = e.signal().raw();

        qs_sm_dispatch!(qs, obj, sig, s.addr());

        let mut t = Some(s);
        let mut outcome = None;
        while let Some(st) = t {
            match (st.state_handler)(me, e) {
                QMStateReturn::Super => t = st.superstate,
                QMStateReturn::Unhandled => {
                    qs_unhandled!(qs, obj, sig, st.addr());
                    t = st.superstate;
                }
                r => {
                    outcome = Some((st, r));
                    break;
                }
            }
        }

        match outcome {
            Some((ts, QMStateReturn::Handled)) => {
                qs_intern_tran!(qs, obj, sig, ts.addr());
            }
            Some((ts, ret)) => {
                self.temp = None;

                let leaf = Self::transition(me, s, ts, ret, obj, qs).map_err(|err| {
                    log::error!("{:#x}: transition on {} failed: {}", obj, e.signal(), err);
                    err
                })?;

                qs_sm_tran!(qs, obj, sig, ts.addr(), leaf.addr());
                log::trace!("{:#x}: {} {:?} -> {:?}", obj, e.signal(), ts, leaf);

                self.state = Some(leaf);
                self.temp = Some(leaf);
            }
            None => {
                qs_ignored!(qs, obj, sig, s.addr());
                log::trace!("{:#x}: {} ignored in {:?}", obj, e.signal(), s);
            }
        }
        Ok(())
    }

    fn is_stable(&self) -> bool {
        self.stable_state().is_ok()
    }
}

impl<M: 'static> fmt::Debug for QMsm<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QMsm")
            .field("state", &self.state)
            .field("temp", &self.temp)
            .finish()
    }
}
