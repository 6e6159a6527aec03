use std::num::TryFromIntError;

use thiserror::Error;

/// Status returned to the host when the module handled the request.
pub const FM_OK: u32 = 0;
pub const FM_ERR_OUT_OF_MEMORY: u32 = 1;
pub const FM_ERR_INVALID_LENGTH: u32 = 2;

pub type FmResult<T> = Result<T, FmError>;

#[derive(Error, Debug)]
pub enum FmError {
    #[error("invalid message length")]
    InvalidLength,

    #[error("out of memory")]
    OutOfMemory,

    #[error("Error loading the Message Dispatch library: {0}")]
    LibLoading(#[from] libloading::Error),

    #[error("{function} failed with : {message}.")]
    MessageDispatch {
        function: &'static str,
        rv: u32,
        message: String,
    },

    #[error("FM failed : {0}")]
    Status(u32),

    #[error(transparent)]
    TryFromIntError(#[from] TryFromIntError),
}

impl FmError {
    /// The status the module replies with for this error.
    #[must_use]
    pub const fn status(&self) -> u32 {
        match self {
            Self::OutOfMemory => FM_ERR_OUT_OF_MEMORY,
            Self::Status(status) => *status,
            _ => FM_ERR_INVALID_LENGTH,
        }
    }
}
