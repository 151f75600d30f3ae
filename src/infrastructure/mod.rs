//! Infrastructure layer: the backing-store boundary and concrete stores

pub mod error;
pub mod fs_store;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs_store::FsStore;
pub use memory::{DomainInfo, MemoryStore, StoreOp};
pub use traits::{Store, StoreHandle};
