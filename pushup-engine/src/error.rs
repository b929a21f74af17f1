use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unable to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed frame at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("frame {frame} at line {line} does not come after frame {previous}")]
    OutOfOrder {
        line: usize,
        frame: u64,
        previous: u64,
    },

    #[error("malformed configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("start offset must be in [0, 100), got {0}")]
    StartOffset(f32),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    #[error("unable to write report: {0}")]
    Report(#[source] std::io::Error),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io { path: path.into(), source }
    }
}
