//! `OrderStore` implementations.

mod file;
mod memory;
mod null;

pub use file::FileOrderStore;
pub use memory::MemoryOrderStore;
pub use null::NullOrderStore;
