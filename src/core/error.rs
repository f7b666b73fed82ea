use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("VCS error: {0}")]
    VcsError(String),
    #[error("Path error: {0}")]
    PathError(String),
}
