use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TapeError {
    #[error("Failed to read input: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write output: {0}")]
    Write(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TapeError>;
