//! Storage adapters: the abstract contract, the in-memory reference
//! implementation, and the two composers built on top of it.

pub mod failover;
pub mod memory;
pub mod sync;
pub mod traits;
