pub mod archive;
pub mod materializer;
pub mod resolver;
pub mod rewriter;
pub mod transient;

pub use archive::{MemoryArchive, ZipArchiveSource};
pub use materializer::{materialize, materialize_entry, Diagnostic, MaterializedSet, MaterializedTexture};
pub use resolver::{classify, Role, RoleClassification};
pub use rewriter::rewrite_references;
pub use transient::{ReleaseList, TransientAddress, TransientError, TransientPayload, TransientStore};

/// How an archive entry is read back: model/material definitions as text,
/// everything else as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Binary,
    Text,
}

/// One file inside an archive, as seen during a single resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub lowercased_path: String,
    pub payload_kind: PayloadKind,
}

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];
const TEXT_EXTENSIONS: &[&str] = &[".obj", ".mtl"];

impl ArchiveEntry {
    pub fn new(path: &str) -> Self {
        let lowercased_path = path.to_lowercase();
        let payload_kind = if TEXT_EXTENSIONS
            .iter()
            .any(|ext| lowercased_path.ends_with(ext))
        {
            PayloadKind::Text
        } else {
            PayloadKind::Binary
        };
        Self {
            path: path.to_string(),
            lowercased_path,
            payload_kind,
        }
    }

    /// Directory markers and macOS resource-fork folders carry no payload.
    pub fn is_skippable(&self) -> bool {
        self.lowercased_path.ends_with('/') || self.lowercased_path.contains("__macosx")
    }

    pub fn is_image(&self) -> bool {
        IMAGE_EXTENSIONS
            .iter()
            .any(|ext| self.lowercased_path.ends_with(ext))
    }

    pub fn basename(&self) -> &str {
        basename(&self.path)
    }
}

pub fn basename(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

/// A decoded archive (or any set of named payloads) the pipeline can read from.
pub trait EntrySource {
    /// Entry paths in archive iteration order.
    fn entry_paths(&self) -> &[String];

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>, AssetError>;

    fn read_text(&mut self, path: &str) -> Result<String, AssetError> {
        let bytes = self.read_entry(path)?;
        String::from_utf8(bytes).map_err(|source| AssetError::NotText {
            path: path.to_string(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to open archive: {source}")]
    OpenArchive {
        #[source]
        source: zip::result::ZipError,
    },
    #[error("archive has no entry named {path}")]
    MissingEntry { path: String },
    #[error("failed to read archive entry {path}: {source}")]
    ReadEntry {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    DecodeImage {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("entry {path} is not valid UTF-8 text")]
    NotText {
        path: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}
