mod modifier;
mod source;
mod word;

pub use modifier::*;
pub use source::*;
pub use word::*;
