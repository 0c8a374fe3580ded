pub mod logging;
pub mod scenario;
pub mod timeouts;

pub use tracing;

/// Control signal broadcast to every running send worker.
#[derive(Debug, Clone, Copy)]
pub enum Signal {
    Shutdown,
}
