//! Types d'erreurs pour tempoqueue

/// Errors of the playlist manager and the persistent state records
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] tempokv::Error),

    #[error("Index {index} out of range for a playlist of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Playlist worker stopped: {0}")]
    WorkerStopped(String),

    #[error("Failed to spawn playlist worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Type Result spécialisé pour tempoqueue
pub type Result<T> = std::result::Result<T, Error>;
