pub mod encoding;
pub mod memory;
pub mod real;
pub mod traits;

pub use encoding::{DecodeError, Encoding, TextFile};
pub use memory::MemoryFileSystem;
pub use real::RealFileSystem;
pub use traits::FileSystem;
