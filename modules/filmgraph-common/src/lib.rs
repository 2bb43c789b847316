pub mod config;
pub mod error;
pub mod file_config;
pub mod types;

pub use config::{AppConfig, Neo4jCredentials};
pub use error::ConfigError;
pub use file_config::{FieldMap, FileConfig, ImportConfig, LinkerConfig, SourceConfig};
pub use types::*;
