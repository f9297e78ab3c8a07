//! Error type for the fallible edges of the crate
//!
//! The session engine itself never fails: capture problems, busy sessions and
//! quiet calibrations all degrade to defined fallbacks. Errors only come from
//! loading configuration and hosting the API.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PolygraphError>;

#[derive(Error, Debug)]
pub enum PolygraphError {
    /// Reading a config file or binding a socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Well-formed config with values the engine cannot run with
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Requested audio source is not compiled in
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),
}
