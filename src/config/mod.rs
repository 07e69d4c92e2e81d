//! Static relay configuration.
//!
//! The configuration is a single YAML file read at startup and shared
//! read-only afterwards. Secret values usually arrive through `${VAR}`
//! references that are expanded right after parsing.

mod env_vars;
mod relay_config;
mod storage_config;

pub use env_vars::expand_env_vars;
pub use relay_config::{RelayConfig, RepositoryConfig};
pub use storage_config::{RepositoryStorage, StorageDefinition, StorageMethod};
