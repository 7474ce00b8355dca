#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # QP Core
//!
//! Core types shared by the QP event processor and the QS tracer:
//! signals and events, the state-handler contract every state implements,
//! and the error type returned by the dispatch engines.

use core::fmt;

pub mod events;
pub mod states;

pub use events::*;
pub use states::*;


/// QP framework version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the QP framework
pub type QResult<T> = Result<T, QError>;

/// Faults raised by the state machine engines.
///
/// Every variant is a modeling or usage error, never an expected runtime
/// condition. A machine that reported one must not be driven again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QError {
    /// Current and temporary state slots differ at the start of a call
    UnstableConfiguration,
    /// `dispatch` or a query was called before `init`
    NotInitialized,
    /// `init` was called twice
    AlreadyInitialized,
    /// An entry path exceeded the maximum nesting depth
    NestingTooDeep,
    /// A handler returned a tag the engine cannot act on here
    InvalidTransition,
    /// The requested parent is not on the active state path
    ChildNotFound,
}

impl fmt::Display for QError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QError::UnstableConfiguration => write!(f, "State configuration is not stable"),
            QError::NotInitialized => write!(f, "State machine is not initialized"),
            QError::AlreadyInitialized => write!(f, "State machine is already initialized"),
            QError::NestingTooDeep => write!(f, "State nesting depth exceeded"),
            QError::InvalidTransition => write!(f, "Invalid state machine transition"),
            QError::ChildNotFound => write!(f, "Parent state is not active"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for QError {}

#[cfg(feature = "defmt")]
impl defmt::Format for QError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            QError::UnstableConfiguration => defmt::write!(fmt, "UnstableConfiguration"),
            QError::NotInitialized => defmt::write!(fmt, "NotInitialized"),
            QError::AlreadyInitialized => defmt::write!(fmt, "AlreadyInitialized"),
            QError::NestingTooDeep => defmt::write!(fmt, "NestingTooDeep"),
            QError::InvalidTransition => defmt::write!(fmt, "InvalidTransition"),
            QError::ChildNotFound => defmt::write!(fmt, "ChildNotFound"),
        }
    }
}
