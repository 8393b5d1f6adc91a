// Error types shared by the library modules. The binary wraps these in
// `anyhow` at the top level; inside the crate each concern keeps its own
// enum so callers can tell a per-file failure from a fatal setup problem.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Gave up after {attempts} attempts, last rejection: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Interrupted")]
    Interrupted,

    #[error(transparent)]
    Output(#[from] OutputError),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output folder {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source path has no file name: {0}")]
    NoFileName(PathBuf),
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("{0} does not exist!")]
    NotFound(PathBuf),

    #[error("Nothing found in {0}")]
    NothingFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Logging Error: {0}")]
    Error(String),
}
