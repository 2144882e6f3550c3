//! Document store backend implementations

pub mod couch;
pub mod memory;

pub use couch::CouchBackend;
pub use memory::MemoryBackend;
