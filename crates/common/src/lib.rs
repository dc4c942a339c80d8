pub mod backoff;
pub mod batch;
pub mod correlation;
pub mod error;
pub mod logging;

pub use backoff::Backoff;
pub use batch::BatchBuffer;
pub use correlation::CorrelationId;
pub use error::{Error, Result};
