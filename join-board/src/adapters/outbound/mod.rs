mod memory;
mod rtdb;

pub use memory::InMemoryStore;
pub use rtdb::RtdbStore;
