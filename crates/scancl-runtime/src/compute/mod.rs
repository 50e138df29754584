mod scheduler;
mod server;
mod stream;

pub(crate) use scheduler::*;
pub(crate) use server::*;
