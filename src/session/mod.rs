//! Session layer: connection registry and protocol coordination

pub mod coordinator;
pub mod registry;

pub use coordinator::{CoordinatorHandle, CoordinatorTask, Intent};
pub use registry::ConnectionRegistry;

/// Session layer errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session coordinator has shut down")]
    CoordinatorClosed,
}
