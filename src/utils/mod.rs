//! Supporting utilities.

pub mod process;

pub use process::{ProcessCommand, ProcessOutput};
