//! Bus transaction state
//!
//! The single enumerated state both backends report, the follow-up
//! operations each state admits, and the small wire-level tags passed into
//! those operations.

pub mod machine;
pub mod wire;

pub use machine::{Operation, State};
pub use wire::{Direction, GeneralCall, Response};

pub(crate) use machine::expect_follow_up;
