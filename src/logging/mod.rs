//! Logging infrastructure for console and file output.

mod logger;
mod subscriber;

pub use logger::Logger;
pub use subscriber::{STAGE_TARGET, init_subscriber};
