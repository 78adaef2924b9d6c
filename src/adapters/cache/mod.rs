//! In-process cache store backed by `moka`.

pub mod memory_store;

pub use memory_store::MemoryCacheStore;
