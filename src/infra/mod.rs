pub mod fs_store;
pub mod memory_store;
pub mod print_queue;

pub use fs_store::FsKeyValueStore;
pub use memory_store::InMemoryKeyValueStore;
pub use print_queue::{InMemoryPrintQueue, NdjsonPrintQueue};
