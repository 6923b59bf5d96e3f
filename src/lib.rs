pub mod automation;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod host;
pub mod media;
pub mod registry;
pub mod session;
pub mod settings;
pub mod state;
pub mod state_machine;
pub mod utils;

#[cfg(test)]
mod tests;

pub use engine::{Capabilities, EngineStatus, EventSender, HostEvent, PipEngine};
pub use error::{HostError, PipError};
pub use session::{ExitReason, PipOutcome};
pub use settings::Settings;
pub use state::PipState;
pub use utils::logger::init_logging;
