//! dnsbatch domain layer
pub mod config;
pub mod dns_record;
pub mod errors;
pub mod names;
pub mod resolution;

pub use config::{CliOverrides, Config, ConfigError, LoggingConfig, ResolverConfig};
pub use dns_record::RecordType;
pub use errors::DomainError;
pub use names::{reverse_name, subdomains};
pub use resolution::{Advance, Resolution, ResolutionTask};
