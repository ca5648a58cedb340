use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpeg", "jpg", "gif", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image must be a data URI of the form data:image/<type>;base64,<payload>")]
    InvalidDataUri,
    #[error("unsupported image type {0:?}")]
    UnsupportedType(String),
    #[error("image payload is not valid base64")]
    Decode(#[from] base64::DecodeError),
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores uploaded recipe images on disk and hands back their public URL.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub const URL_PREFIX: &'static str = "/media";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(&self, data_uri: &str) -> Result<String, ImageError> {
        let (extension, bytes) = decode_data_uri(data_uri)?;
        let dir = self.root.join("recipes");
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(dir.join(&file_name), bytes).await?;

        Ok(format!("{}/recipes/{}", Self::URL_PREFIX, file_name))
    }

    /// Deletes the file behind a URL handed out by `save`. URLs that do not
    /// point into the store are ignored, as is a file that is already gone.
    pub async fn remove(&self, url: &str) -> Result<(), ImageError> {
        let Some(path) = self.path_of(url) else {
            return Ok(());
        };
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Best-effort `remove` for cleanup paths where the caller already has
    /// an outcome to report.
    pub async fn discard(&self, url: &str) {
        if let Err(e) = self.remove(url).await {
            tracing::warn!(url, "failed to remove image: {e}");
        }
    }

    fn path_of(&self, url: &str) -> Option<PathBuf> {
        let file_name = url
            .strip_prefix(Self::URL_PREFIX)?
            .strip_prefix("/recipes/")?;
        if file_name.is_empty() || file_name.starts_with('.') || file_name.contains(['/', '\\']) {
            return None;
        }
        Some(self.root.join("recipes").join(file_name))
    }
}

fn decode_data_uri(data_uri: &str) -> Result<(String, Vec<u8>), ImageError> {
    let rest = data_uri
        .trim()
        .strip_prefix("data:image/")
        .ok_or(ImageError::InvalidDataUri)?;
    let (extension, payload) = rest
        .split_once(";base64,")
        .ok_or(ImageError::InvalidDataUri)?;

    let extension = extension.to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ImageError::UnsupportedType(extension));
    }

    let bytes = STANDARD.decode(payload)?;
    if bytes.is_empty() {
        return Err(ImageError::InvalidDataUri);
    }
    Ok((extension, bytes))
}
