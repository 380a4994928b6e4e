//! Optional mirroring of store state into a key-value medium.
//!
//! The medium is an injected [`Storage`] port rather than an ambient global,
//! so stores can be tested against [`MemoryStorage`] and pointed at
//! [`FileStorage`] (or any other backend) in real use.

mod bridge;
mod storage;

pub(crate) use bridge::PersistenceBridge;
pub use storage::{FileStorage, MemoryStorage, Storage};
