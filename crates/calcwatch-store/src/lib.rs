pub mod file;
pub mod memory;
pub mod types;

pub use file::FileKvStore;
pub use memory::MemoryKvStore;
pub use types::{get_json, put_json, KvStore};
