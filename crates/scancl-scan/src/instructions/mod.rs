mod base;
mod func;
mod numeric;

pub use base::*;
pub use func::*;
pub use numeric::*;
