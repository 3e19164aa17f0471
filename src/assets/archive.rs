use std::io::{Cursor, Read};

use super::{AssetError, EntrySource};

/// Largest buffer reserved up front for an entry, whatever its header claims.
const PREALLOCATE_LIMIT: u64 = 1024 * 1024;

/// ZIP container held fully in memory, with its entry listing taken once in
/// central-directory order.
pub struct ZipArchiveSource {
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
    paths: Vec<String>,
}

impl ZipArchiveSource {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AssetError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|source| AssetError::OpenArchive { source })?;
        let mut paths = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            match archive.by_index(index) {
                Ok(file) => paths.push(file.name().to_string()),
                Err(err) => log::warn!("Skipping unreadable archive entry #{}: {}", index, err),
            }
        }
        log::debug!("Opened archive with {} entries", paths.len());
        Ok(Self { archive, paths })
    }
}

impl EntrySource for ZipArchiveSource {
    fn entry_paths(&self) -> &[String] {
        &self.paths
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>, AssetError> {
        let mut file = self.archive.by_name(path).map_err(|err| match err {
            zip::result::ZipError::FileNotFound => AssetError::MissingEntry {
                path: path.to_string(),
            },
            other => AssetError::OpenArchive { source: other },
        })?;
        // Declared size is untrusted header data.
        let mut bytes = Vec::with_capacity(file.size().min(PREALLOCATE_LIMIT) as usize);
        file.read_to_end(&mut bytes)
            .map_err(|source| AssetError::ReadEntry {
                path: path.to_string(),
                source,
            })?;
        Ok(bytes)
    }
}

/// Named payloads assembled by hand, used when the backend answers with
/// individual file URLs instead of a single archive.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    paths: Vec<String>,
    payloads: Vec<Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; a repeated path replaces the earlier payload but keeps
    /// its position.
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        let path = path.into();
        match self.paths.iter().position(|existing| *existing == path) {
            Some(index) => self.payloads[index] = bytes,
            None => {
                self.paths.push(path);
                self.payloads.push(bytes);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl EntrySource for MemoryArchive {
    fn entry_paths(&self) -> &[String] {
        &self.paths
    }

    fn read_entry(&mut self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.paths
            .iter()
            .position(|existing| existing == path)
            .map(|index| self.payloads[index].clone())
            .ok_or_else(|| AssetError::MissingEntry {
                path: path.to_string(),
            })
    }
}
