mod base;
mod handle;
mod slice;
mod storage;

pub use base::*;
pub use handle::*;
pub use slice::*;
pub use storage::*;
