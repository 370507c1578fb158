pub mod error;
pub mod logging;
pub mod types;

pub use error::{Result, SummarizerError};
pub use types::{CheckState, ObservedState, Role};
