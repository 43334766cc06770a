// On-disk image store for player and team pictures.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unknown asset kind `{0}`, expected `players` or `teams`")]
    UnknownKind(String),

    #[error("asset name `{0}` has no usable characters")]
    EmptyKey(String),

    #[error("unsupported image format, expected PNG, JPEG, WebP or GIF")]
    UnsupportedFormat,

    #[error("no {kind} image named `{key}`")]
    NotFound { kind: AssetKind, key: String },

    #[error("asset store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Players,
    Teams,
}

impl AssetKind {
    pub fn parse(s: &str) -> Result<Self, AssetError> {
        match s {
            "players" => Ok(AssetKind::Players),
            "teams" => Ok(AssetKind::Teams),
            other => Err(AssetError::UnknownKind(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Players => "players",
            AssetKind::Teams => "teams",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Webp,
        ImageFormat::Gif,
    ];

    /// Identify the format from the leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::Webp)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
            ImageFormat::Gif => "gif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }
}

/// Normalise a display name into a file key: lowercase ASCII alphanumerics,
/// with every other run of characters collapsed to one `_` and no `_` at
/// either end. `"MS Dhoni"` becomes `"ms_dhoni"`.
pub fn sanitize_key(name: &str) -> Result<String, AssetError> {
    let mut key = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.push(c);
        } else {
            pending_sep = true;
        }
    }
    if key.is_empty() {
        return Err(AssetError::EmptyKey(name.to_string()));
    }
    Ok(key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAsset {
    pub kind: AssetKind,
    pub key: String,
    pub format: ImageFormat,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Images live at `<root>/<kind>/<key>.<ext>`. At most one file per key is
/// kept; storing a new format replaces the old file.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, kind: AssetKind, key: &str, format: ImageFormat) -> PathBuf {
        self.root
            .join(kind.as_str())
            .join(format!("{key}.{}", format.extension()))
    }

    pub async fn store(
        &self,
        kind: AssetKind,
        name: &str,
        data: &[u8],
    ) -> Result<StoredAsset, AssetError> {
        let key = sanitize_key(name)?;
        let format = ImageFormat::detect(data).ok_or(AssetError::UnsupportedFormat)?;

        tokio::fs::create_dir_all(self.root.join(kind.as_str())).await?;
        for other in ImageFormat::ALL.into_iter().filter(|f| *f != format) {
            match tokio::fs::remove_file(self.path_for(kind, &key, other)).await {
                Ok(()) => debug!(kind = %kind, key = %key, "Replaced image in another format"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let path = self.path_for(kind, &key, format);
        tokio::fs::write(&path, data).await?;
        info!(kind = %kind, key = %key, bytes = data.len(), "Image stored");

        Ok(StoredAsset {
            kind,
            key,
            format,
            path,
            bytes: data.len(),
        })
    }

    pub async fn load(
        &self,
        kind: AssetKind,
        name: &str,
    ) -> Result<(ImageFormat, Vec<u8>), AssetError> {
        let key = sanitize_key(name)?;
        for format in ImageFormat::ALL {
            match tokio::fs::read(self.path_for(kind, &key, format)).await {
                Ok(data) => return Ok((format, data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(AssetError::NotFound { kind, key })
    }
}
