mod compress;
mod fs;

pub use compress::{compress, decompress, reader, Compression};
pub(crate) use fs::*;
