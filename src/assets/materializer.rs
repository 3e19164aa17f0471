use std::io::Cursor;

use super::resolver::{Role, RoleClassification};
use super::transient::{ReleaseList, TransientAddress, TransientStore};
use super::{ArchiveEntry, AssetError, EntrySource, PayloadKind};

/// An image entry exposed through a transient address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedTexture {
    pub path: String,
    pub address: TransientAddress,
    pub width: u32,
    pub height: u32,
}

/// A non-fatal problem met while materializing one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
}

/// Everything one build pulled out of an archive.
#[derive(Debug, Default)]
pub struct MaterializedSet {
    pub model_text: Option<String>,
    pub material_text: Option<String>,
    /// Image entries in archive order.
    pub textures: Vec<MaterializedTexture>,
    /// Classified texture channels.
    pub channels: Vec<(Role, TransientAddress)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MaterializedSet {
    pub fn texture_for(&self, address: &TransientAddress) -> Option<&MaterializedTexture> {
        self.textures
            .iter()
            .find(|texture| &texture.address == address)
    }

    pub fn channel(&self, role: Role) -> Option<&TransientAddress> {
        self.channels
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .map(|(_, address)| address)
    }

    /// Filename keys for the reference rewriter: the full archive path first,
    /// then the bare basename when it differs.
    pub fn references(&self) -> Vec<(&str, &TransientAddress)> {
        let mut references = Vec::with_capacity(self.textures.len() * 2);
        for texture in &self.textures {
            references.push((texture.path.as_str(), &texture.address));
            let basename = super::basename(&texture.path);
            if basename != texture.path {
                references.push((basename, &texture.address));
            }
        }
        references
    }
}

/// Reads the header only; the pixels are decoded by whoever samples the
/// texture.
fn image_dimensions(bytes: &[u8]) -> image::ImageResult<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()
}

/// Validates one image entry and exposes it under a fresh transient address,
/// recorded in `releases`. Does not cache: calling it twice for the same path
/// yields two addresses.
pub fn materialize_entry(
    source: &mut dyn EntrySource,
    path: &str,
    store: &mut TransientStore,
    releases: &mut ReleaseList,
) -> Result<MaterializedTexture, AssetError> {
    let bytes = source.read_entry(path)?;
    let (width, height) = image_dimensions(&bytes).map_err(|source| AssetError::DecodeImage {
        path: path.to_string(),
        source,
    })?;
    let address = store.create(path, bytes, width, height);
    releases.record(address.clone());
    log::debug!("Materialized {} ({}x{}) as {}", path, width, height, address);
    Ok(MaterializedTexture {
        path: path.to_string(),
        address,
        width,
        height,
    })
}

/// Pulls model/material text and every image entry out of `source`.
///
/// Images are materialized once each, in archive order; classified roles then
/// point at those addresses. A failing entry is reported as a diagnostic and
/// leaves its role unset without stopping the others.
pub fn materialize(
    source: &mut dyn EntrySource,
    classification: &RoleClassification,
    store: &mut TransientStore,
    releases: &mut ReleaseList,
) -> MaterializedSet {
    let mut set = MaterializedSet::default();

    for (role, slot) in [
        (Role::Model, &mut set.model_text),
        (Role::Material, &mut set.material_text),
    ] {
        let Some(path) = classification.get(role) else {
            continue;
        };
        match source.read_text(path) {
            Ok(text) => *slot = Some(text),
            Err(err) => {
                log::warn!("Dropping {} entry: {}", role.label(), err);
                set.diagnostics.push(Diagnostic {
                    path: path.to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    let classified: Vec<&str> = classification.textures().map(|(_, path)| path).collect();
    let image_paths: Vec<String> = source
        .entry_paths()
        .iter()
        .filter(|path| {
            let entry = ArchiveEntry::new(path);
            !entry.is_skippable()
                && entry.payload_kind == PayloadKind::Binary
                && (entry.is_image() || classified.contains(&path.as_str()))
        })
        .cloned()
        .collect();

    for path in &image_paths {
        match materialize_entry(source, path, store, releases) {
            Ok(texture) => set.textures.push(texture),
            Err(err) => {
                log::warn!("Texture unavailable: {}", err);
                set.diagnostics.push(Diagnostic {
                    path: path.clone(),
                    message: err.to_string(),
                });
            }
        }
    }

    for (role, path) in classification.textures() {
        if let Some(texture) = set.textures.iter().find(|texture| texture.path == path) {
            set.channels.push((role, texture.address.clone()));
        }
    }

    log::info!(
        "Materialized {} textures ({} channels, model: {}, material: {})",
        set.textures.len(),
        set.channels.len(),
        set.model_text.is_some(),
        set.material_text.is_some()
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{classify, MemoryArchive};
    use crate::test_support::png_bytes;

    fn sample_archive() -> MemoryArchive {
        let mut archive = MemoryArchive::new();
        archive.insert("model.obj", b"v 0 0 0\n".to_vec());
        archive.insert("model.mtl", b"newmtl a\n".to_vec());
        archive.insert("tex/stone_color.png", png_bytes(4, 2));
        archive.insert("tex/stone_normal.png", png_bytes(2, 2));
        archive.insert("tex/broken_rough.png", b"not an image".to_vec());
        archive
    }

    #[test]
    fn materializes_text_and_images() {
        let mut archive = sample_archive();
        let roles = classify(archive.entry_paths().iter().map(String::as_str), None);
        let mut store = TransientStore::new();
        let mut releases = ReleaseList::new();

        let set = materialize(&mut archive, &roles, &mut store, &mut releases);

        assert_eq!(set.model_text.as_deref(), Some("v 0 0 0\n"));
        assert_eq!(set.material_text.as_deref(), Some("newmtl a\n"));
        assert_eq!(set.textures.len(), 2);
        assert_eq!((set.textures[0].width, set.textures[0].height), (4, 2));
        assert!(set.channel(Role::Diffuse).is_some());
        assert!(set.channel(Role::Normal).is_some());
        // The undecodable roughness map is reported, not fatal.
        assert!(set.channel(Role::Roughness).is_none());
        assert_eq!(set.diagnostics.len(), 1);
        assert_eq!(set.diagnostics[0].path, "tex/broken_rough.png");
        assert_eq!(releases.len(), 2);
        assert_eq!(store.outstanding(), 2);
    }

    #[test]
    fn teardown_of_materialized_images_leaves_nothing_outstanding() {
        let mut archive = sample_archive();
        let roles = classify(archive.entry_paths().iter().map(String::as_str), None);
        let mut store = TransientStore::new();
        let before = store.outstanding();
        let mut releases = ReleaseList::new();

        let set = materialize(&mut archive, &roles, &mut store, &mut releases);
        assert_eq!(store.outstanding(), before + set.textures.len());

        releases.release_all(&mut store);
        assert_eq!(store.outstanding(), before);
    }

    #[test]
    fn entry_materialization_does_not_cache() {
        let mut archive = sample_archive();
        let mut store = TransientStore::new();
        let mut releases = ReleaseList::new();
        let first =
            materialize_entry(&mut archive, "tex/stone_color.png", &mut store, &mut releases)
                .unwrap();
        let second =
            materialize_entry(&mut archive, "tex/stone_color.png", &mut store, &mut releases)
                .unwrap();
        assert_ne!(first.address, second.address);
        assert_eq!(releases.len(), 2);
    }

    #[test]
    fn references_list_full_path_before_basename() {
        let mut archive = sample_archive();
        let roles = classify(archive.entry_paths().iter().map(String::as_str), None);
        let mut store = TransientStore::new();
        let mut releases = ReleaseList::new();
        let set = materialize(&mut archive, &roles, &mut store, &mut releases);

        let keys: Vec<&str> = set.references().into_iter().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            vec![
                "tex/stone_color.png",
                "stone_color.png",
                "tex/stone_normal.png",
                "stone_normal.png"
            ]
        );
    }
}
