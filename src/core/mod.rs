//! Core types shared by every other module: the error taxonomy and its
//! user-facing presentation.

pub mod error;

pub use error::{ChainbuildError, ErrorContext, user_friendly_error};
