pub mod assembler;
pub mod session;

pub use assembler::{assemble, ViewInputs};
pub use session::{AutopilotSession, SessionConfig, SessionEvent};
