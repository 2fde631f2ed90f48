//! Error types for sqlproc2pg

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while converting a stored procedure file
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to read input file: {path}")]
    InputReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to create the output directory: {path}")]
    OutputDirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write converted output to {path}")]
    OutputWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read the column name map file: {path}")]
    NameMapReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
