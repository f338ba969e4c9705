//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod object_storage;
pub mod test_dependencies;
pub mod traits;

pub use deps::{MineruAdapter, ServerDeps};
pub use object_storage::{LocalObjectStorage, StorageConfig};
pub use test_dependencies::{MockExtractionClient, MockObjectStorage, TestDependencies};
pub use traits::*;
