//! Hierarchical state machine engine
//!
//! States are plain handler functions. A handler reports its superstate by
//! returning [`QStateReturn::Super`] for signals it does not handle,
//! including the reserved `EMPTY` signal the engine uses to climb the
//! hierarchy. The root of every hierarchy is [`QHsm::top`].

use core::fmt;

use qp_core::{same_state, state_addr, QError, QEvent, QResult, QStateHandler, QStateReturn};
use qp_qs::{
    qs_ignored, qs_init_tran, qs_intern_tran, qs_sm_dispatch, qs_sm_entry, qs_sm_exit,
    qs_sm_init, qs_sm_tran, qs_tran_hist, qs_unhandled, QSpy,
};

use crate::transition::QPath;
use crate::{obj_addr, QStateMachine, EMPTY_EVT, ENTRY_EVT, EXIT_EVT, INIT_EVT, MAX_NEST_DEPTH};

type Path<M> = QPath<QStateHandler<M>, MAX_NEST_DEPTH>;

/// Hierarchical state machine.
///
/// `state` is the active leaf, `temp` the in-progress slot. The two are
/// equal whenever the machine is stable; `temp` is cleared for the
/// duration of a transition and only restored when it completes.
pub struct QHsm<M: 'static> {
    state: Option<QStateHandler<M>>,
    temp: Option<QStateHandler<M>>,
}

impl<M: 'static> QHsm<M> {
    /// Create a machine whose initial pseudostate is `initial`.
    ///
    /// `initial` must return [`QStateReturn::Transition`] when called by
    /// [`QHsm::init`].
    pub const fn new(initial: QStateHandler<M>) -> Self {
        Self {
            state: None,
            temp: Some(initial),
        }
    }

    /// The root of every state hierarchy; ignores all events
    #[inline(never)]
    pub fn top(_me: &mut M, _e: &dyn QEvent) -> QStateReturn<M> {
        QStateReturn::Ignored
    }

    /// Active leaf state, `None` before `init`
    pub fn state(&self) -> Option<QStateHandler<M>> {
        self.state
    }

    /// Check if `state` is the active leaf
    pub fn is_state(&self, state: QStateHandler<M>) -> bool {
        self.state.is_some_and(|s| same_state(s, state))
    }

    /// Check if `state` is active, either as the leaf or as one of its
    /// superstates
    pub fn is_in(&self, me: &mut M, state: QStateHandler<M>) -> QResult<bool> {
        let mut s = self.stable_state()?;
        loop {
            if same_state(s, state) {
                return Ok(true);
            }
            match Self::superstate(me, s) {
                Some(parent) => s = parent,
                None => return Ok(false),
            }
        }
    }

    /// Direct child of `parent` on the active path
    ///
    /// Returns the leaf itself when `parent` is the leaf.
    pub fn child_state(
        &self,
        me: &mut M,
        parent: QStateHandler<M>,
    ) -> QResult<QStateHandler<M>> {
        let mut child = self.stable_state()?;
        let mut s = child;
        loop {
            if same_state(s, parent) {
                return Ok(child);
            }
            child = s;
            s = Self::superstate(me, s).ok_or(QError::ChildNotFound)?;
        }
    }

    fn stable_state(&self) -> QResult<QStateHandler<M>> {
        match (self.state, self.temp) {
            (Some(s), Some(t)) if same_state(s, t) => Ok(s),
            (None, Some(_)) => Err(QError::NotInitialized),
            _ => Err(QError::UnstableConfiguration),
        }
    }

    /// Superstate of `s`, `None` when `s` is the top state
    fn superstate(me: &mut M, s: QStateHandler<M>) -> Option<QStateHandler<M>> {
        match s(me, &EMPTY_EVT) {
            QStateReturn::Super(parent) => Some(parent),
            _ => None,
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

    /// Collect the states from `from` up to `until`, `until` excluded
    fn path_to(
        me: &mut M,
        from: QStateHandler<M>,
        until: QStateHandler<M>,
    ) -> QResult<Path<M>> {
        let mut path = Path::new();
        let mut s = from;
        while !same_state(s, until) {
            let Some(parent) = Self::superstate(me, s) else {
                // `s` is the top state itself
                break;
            };
            path.push(s)?;
            s = parent;
        }
        Ok(path)
    }

    /// Take nested initial transitions starting in the freshly entered
    /// state `t`; returns the leaf reached
    fn drill_into(
        me: &mut M,
        mut t: QStateHandler<M>,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> QResult<QStateHandler<M>> {
        while let QStateReturn::Transition(target) = t(me, &INIT_EVT) {
            qs_sm_init!(qs, obj, state_addr(t), state_addr(target));

            let path = Self::path_to(me, target, t)?;
            for s in path.root_to_leaf() {
                Self::enter(me, s, obj, qs);
            }
            t = target;
        }
        Ok(t)
    }

    /// Enter `target` and its superstates below the top, then drill into
    /// the leaf
    fn enter_target(
        me: &mut M,
        target: QStateHandler<M>,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> QResult<QStateHandler<M>> {
        let path = Self::path_to(me, target, Self::top)?;
        for s in path.root_to_leaf() {
            Self::enter(me, s, obj, qs);
        }
        Self::drill_into(me, target, obj, qs)
    }

    /// Exit the source `s` as far as needed and return the entry path to
    /// `target`, leaf first.
    ///
    /// Cases are tried in a fixed order; the cheap ones cover most
    /// transitions found in practice.
    fn tran(
        me: &mut M,
        s: QStateHandler<M>,
        target: QStateHandler<M>,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> QResult<Path<M>> {
        let mut path = Path::new();
        path.push(target)?;

        // (a) self transition
        if same_state(s, target) {
            Self::exit(me, s, obj, qs);
            return Ok(path);
        }

        // (b) target is a direct child of the source
        let t_super = Self::superstate(me, target);
        if t_super.is_some_and(|p| same_state(p, s)) {
            return Ok(path);
        }

        // (c) source and target are siblings
        let s_super = Self::superstate(me, s);
        if let (Some(sp), Some(tp)) = (s_super, t_super) {
            if same_state(sp, tp) {
                Self::exit(me, s, obj, qs);
                return Ok(path);
            }
        }

        // (d) target is the direct parent of the source
        if s_super.is_some_and(|p| same_state(p, target)) {
            Self::exit(me, s, obj, qs);
            path.truncate(0);
            return Ok(path);
        }

        // (e) source is an ancestor of the target
        let t_super = t_super.ok_or(QError::InvalidTransition)?;
        path.push(t_super)?;
        let mut p = Self::superstate(me, t_super);
        while let Some(ancestor) = p {
            if same_state(ancestor, s) {
                return Ok(path);
            }
            path.push(ancestor)?;
            p = Self::superstate(me, ancestor);
        }

        Self::exit(me, s, obj, qs);

        // (f) superstate of the source is on the target's path
        let mut t = s_super.ok_or(QError::InvalidTransition)?;
        if let Some(lca) = path.find_from_root(|x| same_state(x, t)) {
            path.truncate(lca);
            return Ok(path);
        }

        // (g) climb from the source until an ancestor is on the path
        loop {
            Self::exit(me, t, obj, qs);
            t = Self::superstate(me, t).ok_or(QError::InvalidTransition)?;
            if let Some(lca) = path.find_from_root(|x| same_state(x, t)) {
                path.truncate(lca);
                return Ok(path);
            }
        }
    }

    /// Run a transition taken by `source` while `leaf` was active and
    /// return the new leaf
    fn transition(
        me: &mut M,
        leaf: QStateHandler<M>,
        source: QStateHandler<M>,
        target: QStateHandler<M>,
        history: bool,
        obj: usize,
        qs: &mut dyn QSpy,
    ) -> QResult<QStateHandler<M>> {
        let mut t = leaf;
        while !same_state(t, source) {
            Self::exit(me, t, obj, qs);
            t = Self::superstate(me, t).ok_or(QError::InvalidTransition)?;
        }

        let path = Self::tran(me, source, target, obj, qs)?;

        if history {
            qs_tran_hist!(qs, obj, state_addr(source), state_addr(target));
        }

        for s in path.root_to_leaf() {
            Self::enter(me, s, obj, qs);
        }

        Self::drill_into(me, target, obj, qs)
    }
}

impl<M: 'static> QStateMachine<M> for QHsm<M> {
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

        qs_sm_init!(qs, obj, state_addr(Self::top as QStateHandler<M>), state_addr(target));

        let leaf = Self::enter_target(me, target, obj, qs).map_err(|err| {
            log::error!("init of {:#x} failed: {}", obj, err);
            err
        })?;

        qs_init_tran!(qs, obj, state_addr(leaf));
        log::trace!("{:#x} initialized in {:#x}", obj, state_addr(leaf));

        self.state = Some(leaf);
        self.temp = Some(leaf);
        Ok(())
    }

    fn dispatch(&mut self, me: &mut M, e: &dyn QEvent, qs: &mut dyn QSpy) -> QResult<()> {
        let leaf = self.stable_state().map_err(|err| {
            log::error!("dispatch of {} rejected: {}", e.signal(), err);
            err
        })?;
        let obj = obj_addr(me);
        let sig = e.signal().raw();

        qs_sm_dispatch!(qs, obj, sig, state_addr(leaf));

        let mut s = leaf;
        let r = loop {
            let mut r = s(me, e);
            if r == QStateReturn::Unhandled {
                qs_unhandled!(qs, obj, sig, state_addr(s));
                r = s(me, &EMPTY_EVT);
            }
            match r {
                QStateReturn::Super(parent) => s = parent,
                other => break other,
            }
        };

        match r {
            QStateReturn::Transition(target) | QStateReturn::TranHist(target) => {
                let history = matches!(r, QStateReturn::TranHist(_));
                self.temp = None;

                let new_leaf = Self::transition(me, leaf, s, target, history, obj, qs)
                    .map_err(|err| {
                        log::error!("{:#x}: transition on {} failed: {}", obj, e.signal(), err);
                        err
                    })?;

                qs_sm_tran!(qs, obj, sig, state_addr(s), state_addr(new_leaf));
                log::trace!(
                    "{:#x}: {} {:#x} -> {:#x}",
                    obj,
                    e.signal(),
                    state_addr(s),
                    state_addr(new_leaf)
                );

                self.state = Some(new_leaf);
                self.temp = Some(new_leaf);
            }
            QStateReturn::Handled => {
                qs_intern_tran!(qs, obj, sig, state_addr(s));
            }
            _ => {
                qs_ignored!(qs, obj, sig, state_addr(leaf));
                log::trace!("{:#x}: {} ignored in {:#x}", obj, e.signal(), state_addr(leaf));
            }
        }
        Ok(())
    }

    fn is_stable(&self) -> bool {
        self.stable_state().is_ok()
    }
}

impl<M: 'static> fmt::Debug for QHsm<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QHsm")
            .field("state", &self.state.map(state_addr))
            .field("temp", &self.temp.map(state_addr))
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl<M: 'static> defmt::Format for QHsm<M> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "QHsm {{ state: {}, temp: {} }}",
            self.state.map(state_addr),
            self.temp.map(state_addr)
        );
    }
}
