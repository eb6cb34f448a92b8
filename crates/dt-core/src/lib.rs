pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod vision;

pub use crate::error::{BridgeError, ListenError, VisionError};
pub use crate::event::{Event, Frame, Liveness, Payload, RawText};
