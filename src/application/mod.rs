//! Application layer: sessions and the service surface.
//!
//! - `session`: immutable encryption context and the five operations
//! - `service`: lifecycle state (`init`, replacement, `NotInitialized`)
//! - `command`: line protocol used by the host binary

pub mod command;
mod service;
mod session;

pub use command::Command;
pub use service::ArithmeticService;
pub use session::{DepthPolicy, Session, SessionOptions, SUPPORTED_DEPTH};
