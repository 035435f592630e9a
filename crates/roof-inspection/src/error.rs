use std::path::PathBuf;
use thiserror::Error;

pub type InspectionResult<T> = std::result::Result<T, InspectionError>;

#[derive(Error, Debug)]
pub enum InspectionError {
    #[error("The directory {} does not exist", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("failed to list directory {}: {source}", path.display())]
    ListDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load {file}: {reason:#}")]
    Load { file: String, reason: anyhow::Error },

    #[error("inference failed for {file}: {reason:#}")]
    Inference { file: String, reason: anyhow::Error },

    #[error("model answer for {file} does not fit the schema: {reason:#}")]
    SchemaCoercion { file: String, reason: anyhow::Error },

    #[error("failed to write results to {}: {reason:#}", path.display())]
    Output { path: PathBuf, reason: anyhow::Error },
}
