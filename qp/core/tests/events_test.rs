//! Event tests for qp-core
//! These tests run on x86 host with std for testing, but verify no_std compatible code

use qp_core::{define_events, QDynamicEvent, QEvent, QSignal, QStaticEvent};

// Define test event types
#[derive(Debug, Clone, Copy)]
struct TestEvent {
    signal: QSignal,
}

impl QEvent for TestEvent {
    fn signal(&self) -> QSignal {
        self.signal
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

define_events! {
    enum KeyEvent {
        Press(u8) = 10,
        Release(u8) = 11,
        Reset = 12,
    }
}

#[test]
fn test_event_signal() {
    let sig = QSignal::new(10);
    let event = TestEvent { signal: sig };
    assert_eq!(event.signal(), sig);
}

#[test]
fn test_signal_equality() {
    let sig1 = QSignal::new(42);
    let sig2 = QSignal::from(42);
    assert_eq!(sig1, sig2);
    assert_ne!(sig1, QSignal::new(43));
}

#[test]
fn test_reserved_signals() {
    assert_eq!(QSignal::EMPTY.raw(), 0);
    assert_eq!(QSignal::ENTRY.raw(), 1);
    assert_eq!(QSignal::EXIT.raw(), 2);
    assert_eq!(QSignal::INIT.raw(), 3);
    assert!(QSignal::INIT.is_reserved());
    assert!(!QSignal::USER.is_reserved());

    let e = QStaticEvent::new(QSignal::ENTRY);
    assert!(e.is_reserved());
}

#[test]
fn test_signal_display() {
    assert_eq!(format!("{}", QSignal::EXIT), "EXIT");
    assert_eq!(format!("{}", QSignal::new(7)), "QSignal(7)");
}

#[test]
fn test_static_event_pool() {
    let e = QStaticEvent::new(QSignal::new(5));
    assert_eq!(e.pool_id(), 0);
}

#[test]
fn test_dynamic_event_payload() {
    let e = QDynamicEvent::new(QSignal::new(20), 1234u32).with_pool(2);
    assert_eq!(e.pool_id(), 2);

    let dyn_e: &dyn QEvent = &e;
    let back = dyn_e.downcast_ref::<QDynamicEvent<u32>>().unwrap();
    assert_eq!(back.data, 1234);
    assert!(dyn_e.downcast_ref::<QDynamicEvent<u16>>().is_none());
    assert!(dyn_e.downcast_ref::<QStaticEvent>().is_none());
}

#[test]
fn test_define_events() {
    let press = KeyEvent::Press(3);
    assert_eq!(press.signal(), QSignal::new(10));
    assert_eq!(KeyEvent::Release(3).signal(), QSignal::new(11));
    assert_eq!(KeyEvent::Reset.signal(), QSignal::new(12));

    let dyn_e: &dyn QEvent = &press;
    match dyn_e.downcast_ref::<KeyEvent>() {
        Some(KeyEvent::Press(k)) => assert_eq!(*k, 3),
        other => panic!("unexpected event {:?}", other),
    }
}
