pub mod session;
pub mod unified_state;

pub use session::{PipState, Session};
pub use unified_state::UnifiedSessionState;
