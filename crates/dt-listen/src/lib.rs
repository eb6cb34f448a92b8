pub mod render;
pub mod session;

pub use crate::session::{run_until, Session};
