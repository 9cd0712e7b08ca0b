//! Errors surfaced by the server wiring.
//!
//! The broadcast core itself never fails outward: connection faults are
//! scoped to one subscriber and reported through `client::Disconnect`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
