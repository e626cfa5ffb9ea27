mod config;
mod constants;
mod error;
mod stats;
mod threshold;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use stats::*;
pub use threshold::*;
