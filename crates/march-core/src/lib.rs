pub mod config;
pub mod error;

pub use config::{ArchiveConfig, Compression, LogConfig, LogFormat, MarchConfig};
pub use error::{MarchError, MarchResult};
