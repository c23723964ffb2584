//! Errors raised by the video share core.

/// Result type alias using the share's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown container, or a container whose local root cannot be resolved.
    #[error("not found: {0}")]
    NotFound(String),

    /// The transcoder could not analyze a file.
    #[error("probe failed: {0}")]
    Probe(#[from] tivoshare_av::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote delivery to a device failed.
    #[error("push failed: {0}")]
    Push(anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to render XML: {0}")]
    Render(#[from] xmltree::Error),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Full cause chain, one cause per line.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Push(err) => format!("{err:?}"),
            other => {
                let mut lines = vec![other.to_string()];
                let mut source = std::error::Error::source(other);
                while let Some(cause) = source {
                    lines.push(format!("Caused by: {cause}"));
                    source = cause.source();
                }
                lines.join("\n")
            }
        }
    }
}

impl From<tivoshare_common::Error> for Error {
    fn from(err: tivoshare_common::Error) -> Self {
        match err {
            tivoshare_common::Error::NotFound(what) => Self::NotFound(what),
            tivoshare_common::Error::Io(e) => Self::Io(e),
            other => Self::Config(other.to_string()),
        }
    }
}
