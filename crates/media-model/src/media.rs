//! Media assets handed between the shell and the engine session.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File name the processed video is delivered under.
pub const OUTPUT_FILE_NAME: &str = "processed_video.mp4";

/// Content type of the processed video.
pub const OUTPUT_CONTENT_TYPE: &str = "video/mp4";

/// Logical role of an asset in a processing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetRole {
    VideoInput,
    AudioInput,
    VideoOutput,
}

impl AssetRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetRole::VideoInput => "video-input",
            AssetRole::AudioInput => "audio-input",
            AssetRole::VideoOutput => "video-output",
        }
    }

    /// Whether a content type is plausible for this role.
    ///
    /// Unknown types (`application/octet-stream`) are accepted; the engine
    /// has the final word on what it can decode.
    pub fn accepts(self, content_type: &str) -> bool {
        let top_level = content_type.split('/').next().unwrap_or_default();
        match top_level {
            "video" => matches!(self, AssetRole::VideoInput | AssetRole::VideoOutput),
            "audio" => matches!(self, AssetRole::AudioInput),
            "application" => true,
            _ => false,
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque byte buffer with a role and content type.
///
/// Assets move by value: the shell gives them to the engine session on
/// submit and receives the output asset back on completion.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAsset {
    role: AssetRole,
    content_type: String,
    file_name: Option<String>,
    bytes: Vec<u8>,
}

impl MediaAsset {
    pub fn new(role: AssetRole, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            role,
            content_type: content_type.into(),
            file_name: None,
            bytes,
        }
    }

    /// Read an asset from disk, guessing its content type from the extension.
    pub fn from_path(role: AssetRole, path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        if !role.accepts(&content_type) {
            return Err(MediaError::UnexpectedContentType {
                role,
                content_type,
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| MediaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(MediaError::Empty {
                path: path.to_path_buf(),
            });
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Ok(Self {
            role,
            content_type,
            file_name,
            bytes,
        })
    }

    /// Attach a file name (used when the asset is saved or downloaded).
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn role(&self) -> AssetRole {
        self.role
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the asset bytes to `path`, creating parent directories.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), MediaError> {
        let path = path.as_ref();
        let io_err = |source| MediaError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, &self.bytes).map_err(io_err)
    }
}

impl fmt::Debug for MediaAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAsset")
            .field("role", &self.role)
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Errors that can occur when reading or writing assets.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} looks like {content_type}, which cannot be used as {role}")]
    UnexpectedContentType {
        role: AssetRole,
        content_type: String,
        path: PathBuf,
    },

    #[error("{path} is empty")]
    Empty { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("unmark-media-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_role_accepts_content_types() {
        assert!(AssetRole::VideoInput.accepts("video/mp4"));
        assert!(AssetRole::VideoInput.accepts("application/octet-stream"));
        assert!(!AssetRole::VideoInput.accepts("audio/mpeg"));
        assert!(AssetRole::AudioInput.accepts("audio/mpeg"));
        assert!(!AssetRole::AudioInput.accepts("video/mp4"));
        assert!(!AssetRole::AudioInput.accepts("image/png"));
    }

    #[test]
    fn test_from_path_guesses_content_type() {
        let path = temp_path("clip.mp4");
        std::fs::write(&path, b"not really a video").unwrap();
        let asset = MediaAsset::from_path(AssetRole::VideoInput, &path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(asset.role(), AssetRole::VideoInput);
        assert_eq!(asset.content_type(), "video/mp4");
        assert_eq!(asset.len(), 18);
        assert!(asset.file_name().unwrap().ends_with("clip.mp4"));
    }

    #[test]
    fn test_from_path_rejects_audio_as_video() {
        let path = temp_path("voice.mp3");
        std::fs::write(&path, b"id3").unwrap();
        let err = MediaAsset::from_path(AssetRole::VideoInput, &path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, MediaError::UnexpectedContentType { .. }));
    }

    #[test]
    fn test_from_path_rejects_empty_file() {
        let path = temp_path("empty.mp4");
        std::fs::write(&path, b"").unwrap();
        let err = MediaAsset::from_path(AssetRole::VideoInput, &path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, MediaError::Empty { .. }));
    }

    #[test]
    fn test_debug_omits_bytes() {
        let asset = MediaAsset::new(AssetRole::VideoOutput, OUTPUT_CONTENT_TYPE, vec![0; 4096])
            .with_file_name(OUTPUT_FILE_NAME);
        let debug = format!("{asset:?}");
        assert!(debug.contains("len: 4096"));
        assert!(debug.contains(OUTPUT_FILE_NAME));
    }
}
