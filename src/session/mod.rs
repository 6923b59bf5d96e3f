//! PiP session lifecycle.
//!
//! [`SessionController`] owns the single session: it requests entry and exit
//! from the native capability, arbitrates concurrent playback and wires the
//! per-session bindings (exit callback, resize memory, media controls).

pub mod bindings;
mod controller;
pub mod size_memory;

pub use bindings::SessionBindings;
pub use controller::{ExitReason, PipOutcome, SessionController};
pub use size_memory::SizeMemory;
