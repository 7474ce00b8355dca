//! Flat state machine engine
//!
//! All states sit one level below an implicit top. A transition exits the
//! active state and enters the target; there is no hierarchy to climb and
//! no nested initial transition to follow.

use core::fmt;

use qp_core::{same_state, state_addr, QError, QEvent, QResult, QStateHandler, QStateReturn};
use qp_qs::{
    qs_ignored, qs_init_tran, qs_intern_tran, qs_sm_dispatch, qs_sm_entry, qs_sm_exit,
    qs_sm_init, qs_sm_tran, qs_unhandled, QSpy,
};

use crate::{obj_addr, QStateMachine, ENTRY_EVT, EXIT_EVT};

/// Flat state machine
pub struct QFsm<M: 'static> {
    state: Option<QStateHandler<M>>,
    temp: Option<QStateHandler<M>>,
}

impl<M: 'static> QFsm<M> {
    /// Create a machine whose initial pseudostate is `initial`
    pub const fn new(initial: QStateHandler<M>) -> Self {
        Self {
            state: None,
            temp: Some(initial),
        }
    }

    /// Active state, `None` before `init`
    pub fn state(&self) -> Option<QStateHandler<M>> {
        self.state
    }

    /// Check if `state` is the active state
    pub fn is_state(&self, state: QStateHandler<M>) -> bool {
        self.state.is_some_and(|s| same_state(s, state))
    }

    fn stable_state(&self) -> QResult<QStateHandler<M>> {
        match (self.state, self.temp) {
            (Some(s), Some(t)) if same_state(s, t) => Ok(s),
            (None, Some(_)) => Err(QError::NotInitialized),
            _ => Err(QError::UnstableConfiguration),
        }
    }

    fn enter(me: &mut M, s: QStateHandler<M>, obj: usize, qs: &mut dyn QSpy) {
        if s(me, &ENTRY_EVT) == QStateReturn::Handled {
            qs_sm_entry!(qs, obj, state_addr(s));
        }
    }

    fn exit(me: &mut M, s: QStateHandler<M>, obj: usize, qs: &mut dyn QSpy) {
        if s(me, &EXIT_EVT) == QStateReturn::Handled {
            qs_sm_exit!(qs, obj, state_addr(s));
        }
    }
}

impl<M: 'static> QStateMachine<M> for QFsm<M> {
    fn init(&mut self, me: &mut M, e: &dyn QEvent, qs: &mut dyn QSpy) -> QResult<()> {
        if self.state.is_some() {
            return Err(QError::AlreadyInitialized);
        }
        let initial = self.temp.take().ok_or(QError::UnstableConfiguration)?;
        let obj = obj_addr(me);

        let target = match initial(me, e) {
            QStateReturn::Transition(target) => target,
            other => {
                log::error!("initial pseudostate returned {:?}", other);
                return Err(QError::InvalidTransition);
            }
        };

        qs_sm_init!(qs, obj, state_addr(initial), state_addr(target));
        Self::enter(me, target, obj, qs);
        qs_init_tran!(qs, obj, state_addr(target));

        self.state = Some(target);
        self.temp = Some(target);
        Ok(())
    }

    fn dispatch(&mut self, me: &mut M, e: &dyn QEvent, qs: &mut dyn QSpy) -> QResult<()> {
        let s = self.stable_state().map_err(|err| {
            log::error!("dispatch of {} rejected: {}", e.signal(), err);
            err
        })?;
        let obj = obj_addr(me);
        let sig = e.signal().raw();

        qs_sm_dispatch!(qs, obj, sig, state_addr(s));

        match s(me, e) {
            QStateReturn::Transition(t) | QStateReturn::TranHist(t) => {
                self.temp = Some(t);
                Self::exit(me, s, obj, qs);
                Self::enter(me, t, obj, qs);

                qs_sm_tran!(qs, obj, sig, state_addr(s), state_addr(t));
                log::trace!("{:#x}: {} {:#x} -> {:#x}", obj, e.signal(), state_addr(s), state_addr(t));

                self.state = Some(t);
            }
            QStateReturn::Handled => {
                qs_intern_tran!(qs, obj, sig, state_addr(s));
            }
            other => {
                if other == QStateReturn::Unhandled {
                    qs_unhandled!(qs, obj, sig, state_addr(s));
                }
                qs_ignored!(qs, obj, sig, state_addr(s));
                log::trace!("{:#x}: {} ignored in {:#x}", obj, e.signal(), state_addr(s));
            }
        }
        Ok(())
    }

    fn is_stable(&self) -> bool {
        self.stable_state().is_ok()
    }
}

impl<M: 'static> fmt::Debug for QFsm<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QFsm")
            .field("state", &self.state.map(state_addr))
            .field("temp", &self.temp.map(state_addr))
            .finish()
    }
}
