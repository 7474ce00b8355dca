//! Hierarchical state machine tests for qp-qep

use qp_core::{
    handled, q_state_tag, same_state, super_state, tran_hist, transition, unhandled, QError, QEvent, QSignal,
    QStateHandler, QStateReturn, QStaticEvent,
};
use qp_qs::{QSDummy, QSRecordType};

use super::RecordLog;
use crate::{QHsm, QStateMachine, INIT_EVT};

const GO: QSignal = QSignal::new(10);
const BACK: QSignal = QSignal::new(20);
const STAY: QSignal = QSignal::new(11);
const AGAIN: QSignal = QSignal::new(12);
const HIST: QSignal = QSignal::new(13);
const GUARD: QSignal = QSignal::new(14);
const NOBODY: QSignal = QSignal::new(99);

#[derive(Default)]
struct Scene {
    log: Vec<&'static str>,
    open: bool,
}

fn evt(sig: QSignal) -> QStaticEvent {
    QStaticEvent::new(sig)
}

// top -> a -> a1, top -> b -> b1

fn scene_initial(_me: &mut Scene, _e: &dyn QEvent) -> QStateReturn<Scene> {
    transition(state_a)
}

fn state_a(me: &mut Scene, e: &dyn QEvent) -> QStateReturn<Scene> {
    match e.signal() {
        QSignal::ENTRY => {
            me.log.push("A-ENTRY");
            handled()
        }
        QSignal::EXIT => {
            me.log.push("A-EXIT");
            handled()
        }
        QSignal::INIT => transition(state_a1),
        GO => transition(state_b1),
        HIST => tran_hist(state_b1),
        GUARD => {
            me.log.push("A-GUARD");
            handled()
        }
        _ => super_state(QHsm::top),
    }
}

fn state_a1(me: &mut Scene, e: &dyn QEvent) -> QStateReturn<Scene> {
    match e.signal() {
        QSignal::ENTRY => {
            me.log.push("A1-ENTRY");
            handled()
        }
        QSignal::EXIT => {
            me.log.push("A1-EXIT");
            handled()
        }
        STAY => {
            me.log.push("A1-STAY");
            handled()
        }
        AGAIN => transition(state_a1),
        GUARD if !me.open => unhandled(),
        _ => super_state(state_a),
    }
}

fn state_b(me: &mut Scene, e: &dyn QEvent) -> QStateReturn<Scene> {
    match e.signal() {
        QSignal::ENTRY => {
            me.log.push("B-ENTRY");
            handled()
        }
        QSignal::EXIT => {
            me.log.push("B-EXIT");
            handled()
        }
        BACK => transition(state_a),
        _ => super_state(QHsm::top),
    }
}

fn state_b1(me: &mut Scene, e: &dyn QEvent) -> QStateReturn<Scene> {
    match e.signal() {
        QSignal::ENTRY => {
            me.log.push("B1-ENTRY");
            handled()
        }
        QSignal::EXIT => {
            me.log.push("B1-EXIT");
            handled()
        }
        _ => super_state(state_b),
    }
}

fn started() -> (QHsm<Scene>, Scene) {
    let mut me = Scene::default();
    let mut hsm = QHsm::new(scene_initial);
    hsm.init(&mut me, &INIT_EVT, &mut QSDummy).unwrap();
    me.log.clear();
    (hsm, me)
}

fn is<M>(state: Option<QStateHandler<M>>, expected: QStateHandler<M>) -> bool {
    state.is_some_and(|s| same_state(s, expected))
}

#[test]
fn test_hsm_creation() {
    let hsm: QHsm<Scene> = QHsm::new(scene_initial);
    assert!(hsm.state().is_none());
    assert!(!hsm.is_stable());
}

#[test]
fn test_hsm_init_drills_into_leaf() {
    let mut me = Scene::default();
    let mut hsm = QHsm::new(scene_initial);
    let mut qs = RecordLog::default();

    hsm.init(&mut me, &INIT_EVT, &mut qs).unwrap();

    assert!(is(hsm.state(), state_a1));
    assert!(hsm.is_stable());
    assert_eq!(me.log, ["A-ENTRY", "A1-ENTRY"]);
    assert_eq!(
        qs.records,
        [
            QSRecordType::QS_QEP_STATE_INIT,
            QSRecordType::QS_QEP_STATE_ENTRY,
            QSRecordType::QS_QEP_STATE_INIT,
            QSRecordType::QS_QEP_STATE_ENTRY,
            QSRecordType::QS_QEP_INIT_TRAN,
        ]
    );
}

#[test]
fn test_hsm_transition_through_root() {
    let (mut hsm, mut me) = started();
    let mut qs = RecordLog::default();

    hsm.dispatch(&mut me, &evt(GO), &mut qs).unwrap();

    assert!(is(hsm.state(), state_b1));
    assert_eq!(me.log, ["A1-EXIT", "A-EXIT", "B-ENTRY", "B1-ENTRY"]);
    assert_eq!(
        qs.records,
        [
            QSRecordType::QS_QEP_DISPATCH,
            QSRecordType::QS_QEP_STATE_EXIT,
            QSRecordType::QS_QEP_STATE_EXIT,
            QSRecordType::QS_QEP_STATE_ENTRY,
            QSRecordType::QS_QEP_STATE_ENTRY,
            QSRecordType::QS_QEP_TRAN,
        ]
    );
}

#[test]
fn test_hsm_bidirectional_transitions() {
    let (mut hsm, mut me) = started();

    hsm.dispatch(&mut me, &evt(GO), &mut QSDummy).unwrap();
    assert!(is(hsm.state(), state_b1));

    me.log.clear();
    hsm.dispatch(&mut me, &evt(BACK), &mut QSDummy).unwrap();
    assert!(is(hsm.state(), state_a1));
    assert_eq!(me.log, ["B1-EXIT", "B-EXIT", "A-ENTRY", "A1-ENTRY"]);
}

#[test]
fn test_hsm_internal_transition() {
    let (mut hsm, mut me) = started();
    let mut qs = RecordLog::default();

    hsm.dispatch(&mut me, &evt(STAY), &mut qs).unwrap();

    assert!(is(hsm.state(), state_a1));
    assert_eq!(me.log, ["A1-STAY"]);
    assert_eq!(qs.count(QSRecordType::QS_QEP_INTERN_TRAN), 1);
    assert_eq!(qs.count(QSRecordType::QS_QEP_STATE_ENTRY), 0);
    assert_eq!(qs.count(QSRecordType::QS_QEP_STATE_EXIT), 0);
}

#[test]
fn test_hsm_self_transition() {
    let (mut hsm, mut me) = started();

    hsm.dispatch(&mut me, &evt(AGAIN), &mut QSDummy).unwrap();

    assert!(is(hsm.state(), state_a1));
    assert_eq!(me.log, ["A1-EXIT", "A1-ENTRY"]);
}

#[test]
fn test_hsm_ignored_event_changes_nothing() {
    let (mut hsm, mut me) = started();
    let mut qs = RecordLog::default();

    hsm.dispatch(&mut me, &evt(NOBODY), &mut qs).unwrap();
    hsm.dispatch(&mut me, &evt(NOBODY), &mut qs).unwrap();

    assert!(is(hsm.state(), state_a1));
    assert!(hsm.is_stable());
    assert!(me.log.is_empty());
    assert_eq!(qs.count(QSRecordType::QS_QEP_IGNORED), 2);
}

#[test]
fn test_hsm_guard_passes_event_up() {
    let (mut hsm, mut me) = started();
    let mut qs = RecordLog::default();

    hsm.dispatch(&mut me, &evt(GUARD), &mut qs).unwrap();

    assert_eq!(me.log, ["A-GUARD"]);
    assert_eq!(
        qs.records,
        [
            QSRecordType::QS_QEP_DISPATCH,
            QSRecordType::QS_QEP_UNHANDLED,
            QSRecordType::QS_QEP_INTERN_TRAN,
        ]
    );
}

#[test]
fn test_hsm_transition_to_history_is_traced() {
    let (mut hsm, mut me) = started();
    let mut qs = RecordLog::default();

    hsm.dispatch(&mut me, &evt(HIST), &mut qs).unwrap();

    assert!(is(hsm.state(), state_b1));
    assert_eq!(me.log, ["A1-EXIT", "A-EXIT", "B-ENTRY", "B1-ENTRY"]);
    assert_eq!(qs.count(QSRecordType::QS_QEP_TRAN_HIST), 1);
    assert_eq!(qs.records.last(), Some(&QSRecordType::QS_QEP_TRAN));
}

#[test]
fn test_hsm_is_in() {
    let (hsm, mut me) = started();

    assert_eq!(hsm.is_in(&mut me, state_a1), Ok(true));
    assert_eq!(hsm.is_in(&mut me, state_a), Ok(true));
    assert_eq!(hsm.is_in(&mut me, QHsm::top), Ok(true));
    assert_eq!(hsm.is_in(&mut me, state_b), Ok(false));
    assert!(hsm.is_stable());
    assert!(me.log.is_empty());
}

#[test]
fn test_hsm_child_state() {
    let (hsm, mut me) = started();

    let child = hsm.child_state(&mut me, QHsm::top).unwrap();
    assert!(same_state(child, state_a));
    let child = hsm.child_state(&mut me, state_a).unwrap();
    assert!(same_state(child, state_a1));
    let child = hsm.child_state(&mut me, state_a1).unwrap();
    assert!(same_state(child, state_a1));

    assert_eq!(
        hsm.child_state(&mut me, state_b).map(|s| s as usize),
        Err(QError::ChildNotFound)
    );
}

#[test]
fn test_hsm_usage_errors() {
    let mut me = Scene::default();
    let mut hsm = QHsm::new(scene_initial);

    assert_eq!(
        hsm.dispatch(&mut me, &evt(GO), &mut QSDummy),
        Err(QError::NotInitialized)
    );
    assert_eq!(hsm.is_in(&mut me, state_a), Err(QError::NotInitialized));

    hsm.init(&mut me, &INIT_EVT, &mut QSDummy).unwrap();
    assert_eq!(
        hsm.init(&mut me, &INIT_EVT, &mut QSDummy),
        Err(QError::AlreadyInitialized)
    );
}

// top -> menu -> {item_a, item_b}, both leaves with the same body

const NEXT: QSignal = QSignal::new(15);

#[derive(Default)]
struct Menu {
    on_b: bool,
}

fn menu_initial(_me: &mut Menu, _e: &dyn QEvent) -> QStateReturn<Menu> {
    transition(menu)
}

fn menu(me: &mut Menu, e: &dyn QEvent) -> QStateReturn<Menu> {
    match e.signal() {
        QSignal::INIT => transition(item_a),
        NEXT => {
            me.on_b = !me.on_b;
            if me.on_b {
                transition(item_b)
            } else {
                transition(item_a)
            }
        }
        _ => super_state(QHsm::top),
    }
}

fn item_a(_me: &mut Menu, _e: &dyn QEvent) -> QStateReturn<Menu> {
    q_state_tag!();
    super_state(menu)
}

fn item_b(_me: &mut Menu, _e: &dyn QEvent) -> QStateReturn<Menu> {
    q_state_tag!();
    super_state(menu)
}

#[test]
fn test_hsm_tagged_leaves_keep_their_identity() {
    assert!(!same_state::<Menu>(item_a, item_b));

    let mut me = Menu::default();
    let mut hsm = QHsm::new(menu_initial);
    hsm.init(&mut me, &INIT_EVT, &mut QSDummy).unwrap();
    assert!(is(hsm.state(), item_a));
    assert!(!hsm.is_state(item_b));

    hsm.dispatch(&mut me, &evt(NEXT), &mut QSDummy).unwrap();
    assert!(hsm.is_state(item_b));
    assert!(!hsm.is_state(item_a));
    assert_eq!(hsm.is_in(&mut me, item_a), Ok(false));
    assert_eq!(hsm.is_in(&mut me, menu), Ok(true));
    let child = hsm.child_state(&mut me, menu).unwrap();
    assert!(same_state(child, item_b));

    hsm.dispatch(&mut me, &evt(NEXT), &mut QSDummy).unwrap();
    assert!(hsm.is_state(item_a));
}

fn bad_initial(_me: &mut Scene, _e: &dyn QEvent) -> QStateReturn<Scene> {
    handled()
}

#[test]
fn test_hsm_initial_must_transition() {
    let mut me = Scene::default();
    let mut hsm = QHsm::new(bad_initial);

    assert_eq!(
        hsm.init(&mut me, &INIT_EVT, &mut QSDummy),
        Err(QError::InvalidTransition)
    );
    assert!(hsm.state().is_none());
}

// Seven nested states, one more than the engine supports

const DIVE: QSignal = QSignal::new(30);

#[derive(Default)]
struct Deep {
    entered: usize,
}

fn deep_initial(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    transition(shallow)
}

fn too_deep_initial(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    transition(d7)
}

fn shallow(_me: &mut Deep, e: &dyn QEvent) -> QStateReturn<Deep> {
    match e.signal() {
        DIVE => transition(d7),
        _ => super_state(QHsm::top),
    }
}

fn d1(me: &mut Deep, e: &dyn QEvent) -> QStateReturn<Deep> {
    match e.signal() {
        QSignal::ENTRY => {
            me.entered += 1;
            handled()
        }
        _ => super_state(QHsm::top),
    }
}

fn d2(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    super_state(d1)
}

fn d3(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    super_state(d2)
}

fn d4(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    super_state(d3)
}

fn d5(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    super_state(d4)
}

fn d6(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    super_state(d5)
}

fn d7(_me: &mut Deep, _e: &dyn QEvent) -> QStateReturn<Deep> {
    super_state(d6)
}

#[test]
fn test_hsm_init_nesting_too_deep() {
    let mut me = Deep::default();
    let mut hsm = QHsm::new(too_deep_initial);

    assert_eq!(
        hsm.init(&mut me, &INIT_EVT, &mut QSDummy),
        Err(QError::NestingTooDeep)
    );
    assert_eq!(me.entered, 0);
    assert_eq!(
        hsm.dispatch(&mut me, &evt(DIVE), &mut QSDummy),
        Err(QError::UnstableConfiguration)
    );
}

#[test]
fn test_hsm_fault_leaves_machine_unstable() {
    let mut me = Deep::default();
    let mut hsm = QHsm::new(deep_initial);
    hsm.init(&mut me, &INIT_EVT, &mut QSDummy).unwrap();
    assert!(hsm.is_stable());

    assert_eq!(
        hsm.dispatch(&mut me, &evt(DIVE), &mut QSDummy),
        Err(QError::NestingTooDeep)
    );
    assert!(!hsm.is_stable());
    assert_eq!(
        hsm.dispatch(&mut me, &evt(DIVE), &mut QSDummy),
        Err(QError::UnstableConfiguration)
    );
    assert_eq!(hsm.is_in(&mut me, shallow), Err(QError::UnstableConfiguration));
}
