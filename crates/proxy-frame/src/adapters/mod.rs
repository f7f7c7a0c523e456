//! Stateful tables behind the service, plus the in-memory host.

pub mod loaders;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod pending;
pub mod registry;

pub use loaders::{LoaderTable, PendingLoad};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryChannel, MemoryFrameHost, PostedMessage};
pub use pending::{PendingRequestTable, PendingStats};
pub use registry::FrameRegistry;
