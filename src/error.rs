//! Centralized error type for the midiroute umbrella crate.
//!
//! Wraps both subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] midiroute_core::Error),

    #[error("Output: {0}")]
    Output(#[from] midiroute_io::Error),
}

impl Error {
    /// The endpoint behind the router cannot perform the requested operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Output(e) if e.is_unsupported())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
