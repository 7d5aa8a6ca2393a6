use thiserror::Error;
use weaver_core::{CacheError, CoreError};

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error(transparent)]
    Core(CoreError),

    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Pass was cancelled")]
    Cancelled,

    #[error("Cache entry unavailable: {0}")]
    CachePoisoned(#[from] CacheError),

    #[error("Unknown shape: {0}")]
    UnknownShape(String),
}

impl From<CoreError> for CodegenError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Cancelled => CodegenError::Cancelled,
            other => CodegenError::Core(other),
        }
    }
}
