//! Media-control surface module.
//!
//! Mirrors the PiP video onto the platform media session (metadata,
//! transport actions, playback and position state).

mod controller;
pub mod metadata;

pub use controller::{perform_action, MediaControlSync};
pub use metadata::resolve_metadata;
