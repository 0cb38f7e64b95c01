//! Session orchestration.
//!
//! Owns the monitor lifecycle and routes UI commands to the dispatcher. UI/CLI layers
//! call into this module to keep responsibilities separated.

mod controller;

pub(crate) use controller::{run_controller, UiCommand};
