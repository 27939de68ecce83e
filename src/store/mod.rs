//! # Checkpoint Stores
//!
//! `CheckpointStore` implementations. `FileCheckpointStore` keeps one JSON
//! document per checkpoint and survives restarts; `InMemoryCheckpointStore` is
//! process-local and suited to tests and single-process embedding.

pub mod file;
pub mod memory;

pub use file::FileCheckpointStore;
pub use memory::InMemoryCheckpointStore;
