use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

/// An image file read into memory, ready to be attached to a multimodal prompt.
#[derive(Debug, Clone)]
pub struct ImageInput {
    path: PathBuf,
    mime_type: String,
    data: Vec<u8>,
}

impl ImageInput {
    /// Reads the file as-is. No decoding or resizing happens here, the content
    /// type is sniffed from the bytes and falls back to the file extension.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mime_type = sniff_mime_type(path, &data);

        tracing::debug!(
            "loaded {} ({}, {} bytes)",
            path.display(),
            mime_type,
            data.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            mime_type,
            data,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

fn sniff_mime_type(path: &Path, data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}
