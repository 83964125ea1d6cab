use thiserror::Error;

/// Failures that end the process with a dedicated exit status.
#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("Resizing disabled by policy: {0}")]
    BlockedByPolicy(String),

    #[error("No mount entry found for /")]
    RootMountNotFound,

    #[error("No usable disk device found: {0}")]
    NoDiskDevice(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ResizeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ResizeError::Unexpected(_) => 1,
            ResizeError::BlockedByPolicy(_) => 2,
            ResizeError::RootMountNotFound => 3,
            ResizeError::NoDiskDevice(_) => 4,
        }
    }
}
