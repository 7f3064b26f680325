//! mcwire Core - error types, protocol enums and shared limits

mod error;
mod types;

pub use error::*;
pub use types::*;
