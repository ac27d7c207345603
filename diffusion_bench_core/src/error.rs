use std::path::PathBuf;

/// Failures owned by the harness itself. Errors raised by a model backend are
/// passed through untouched as `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("could not read benchmark plan `{}`: {source}", .path.display())]
    PlanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid benchmark plan: {0}")]
    PlanParse(#[from] serde_json::Error),
    #[error("cannot build an image grid from an empty batch")]
    EmptyBatch,
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, BenchError>;
