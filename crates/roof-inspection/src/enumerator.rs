use crate::{InspectionError, InspectionResult};
use std::{ffi::OsString, path::Path};

pub async fn ensure_directory(dir: &Path) -> InspectionResult<()> {
    match tokio::fs::metadata(dir).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        _ => Err(InspectionError::DirectoryNotFound(dir.to_path_buf())),
    }
}

/// Names of the entries directly inside `dir`, in listing order.
///
/// Names are kept as the OS returned them, so files whose names are not valid
/// UTF-8 can still be opened.
///
/// Nothing is filtered out: subdirectories and non-image files are returned too
/// and fail later, when they are loaded or sent to the model.
pub async fn list_entries(dir: &Path) -> InspectionResult<Vec<OsString>> {
    ensure_directory(dir).await?;

    let list_error = |source| InspectionError::ListDirectory {
        path: dir.to_path_buf(),
        source,
    };

    let mut read_dir = tokio::fs::read_dir(dir).await.map_err(list_error)?;
    let mut entries = vec![];
    while let Some(entry) = read_dir.next_entry().await.map_err(list_error)? {
        entries.push(entry.file_name());
    }

    Ok(entries)
}
