//! External process execution

pub mod subprocess;

pub use subprocess::{CommandSpec, ProcessRunner, StreamingRunner};
