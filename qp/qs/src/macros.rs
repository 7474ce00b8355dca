//! QS Tracing Macros
//!
//! High-level macros for the predefined state machine records. Each takes
//! the [`QSpy`](crate::QSpy) sink as its first argument, evaluates the
//! payload only when the record passes the filters, and writes the fields
//! in the order the host expects.

// ============================================================================
// State Machine Macros
// ============================================================================

/// Trace state entry
#[macro_export]
macro_rules! qs_sm_entry {
    ($qs:expr, $obj:expr, $state:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_STATE_ENTRY, $obj) {
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $state);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace state exit
#[macro_export]
macro_rules! qs_sm_exit {
    ($qs:expr, $obj:expr, $state:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_STATE_EXIT, $obj) {
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $state);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace a nested initial transition taken from `$source`
#[macro_export]
macro_rules! qs_sm_init {
    ($qs:expr, $obj:expr, $source:expr, $target:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_STATE_INIT, $obj) {
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $source);
            $crate::QSpy::fun(&mut *$qs, $target);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace completion of the top-most initial transition
#[macro_export]
macro_rules! qs_init_tran {
    ($qs:expr, $obj:expr, $target:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_INIT_TRAN, $obj) {
            $crate::QSpy::time(&mut *$qs);
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $target);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace internal transition
#[macro_export]
macro_rules! qs_intern_tran {
    ($qs:expr, $obj:expr, $sig:expr, $source:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_INTERN_TRAN, $obj) {
            $crate::QSpy::time(&mut *$qs);
            $crate::QSpy::sig(&mut *$qs, $sig);
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $source);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace state transition
#[macro_export]
macro_rules! qs_sm_tran {
    ($qs:expr, $obj:expr, $sig:expr, $source:expr, $target:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_TRAN, $obj) {
            $crate::QSpy::time(&mut *$qs);
            $crate::QSpy::sig(&mut *$qs, $sig);
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $source);
            $crate::QSpy::fun(&mut *$qs, $target);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace transition to history
#[macro_export]
macro_rules! qs_tran_hist {
    ($qs:expr, $obj:expr, $source:expr, $hist:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_TRAN_HIST, $obj) {
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $source);
            $crate::QSpy::fun(&mut *$qs, $hist);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace ignored event
#[macro_export]
macro_rules! qs_ignored {
    ($qs:expr, $obj:expr, $sig:expr, $state:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_IGNORED, $obj) {
            $crate::QSpy::time(&mut *$qs);
            $crate::QSpy::sig(&mut *$qs, $sig);
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $state);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace event dispatch
#[macro_export]
macro_rules! qs_sm_dispatch {
    ($qs:expr, $obj:expr, $sig:expr, $state:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_DISPATCH, $obj) {
            $crate::QSpy::time(&mut *$qs);
            $crate::QSpy::sig(&mut *$qs, $sig);
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $state);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

/// Trace a guard that rejected the event
#[macro_export]
macro_rules! qs_unhandled {
    ($qs:expr, $obj:expr, $sig:expr, $state:expr) => {
        if $crate::QSpy::begin(&mut *$qs, $crate::QSRecordType::QS_QEP_UNHANDLED, $obj) {
            $crate::QSpy::sig(&mut *$qs, $sig);
            $crate::QSpy::obj(&mut *$qs, $obj);
            $crate::QSpy::fun(&mut *$qs, $state);
            $crate::QSpy::end(&mut *$qs);
        }
    };
}

// ============================================================================
// Dictionary Macros
// ============================================================================

/// Generate object dictionary record named after the expression
#[macro_export]
macro_rules! qs_obj_dict {
    ($qs:expr, $obj:expr) => {
        $qs.obj_dict($obj as *const _ as usize, stringify!($obj))
    };
}

/// Generate function dictionary record named after the function
#[macro_export]
macro_rules! qs_fun_dict {
    ($qs:expr, $fun:expr) => {
        $qs.fun_dict($fun as *const () as usize, stringify!($fun))
    };
}

/// Generate signal dictionary record
#[macro_export]
macro_rules! qs_sig_dict {
    ($qs:expr, $sig:expr, $obj:expr) => {
        $qs.sig_dict($sig, $obj, stringify!($sig))
    };
}

/// Generate user record dictionary
#[macro_export]
macro_rules! qs_usr_dict {
    ($qs:expr, $rec:expr) => {
        $qs.usr_dict($rec, stringify!($rec))
    };
}
