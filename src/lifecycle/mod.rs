//! Process lifecycle: logging setup and shutdown signals

mod logging;
mod shutdown;

pub use logging::init_logging;
pub use shutdown::ShutdownSignal;
