pub mod artifact;
pub mod config;
pub mod error;
pub mod progress;
pub mod retry;

pub use artifact::*;
pub use config::Config;
pub use error::*;
pub use progress::{ProgressEvent, ProgressStage};
pub use retry::RetryPolicy;
