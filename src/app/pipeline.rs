//! Response → archive → classified, materialized, rewritten build input.

use crate::assets::{
    basename, classify, materialize, rewrite_references, EntrySource, MemoryArchive, ReleaseList,
    TransientStore, ZipArchiveSource,
};
use crate::backend::{GenerationBackend, GenerationResponse};
use crate::scene::BuildInput;

use super::AppError;

/// Archive entry name for a downloaded file: the last path segment of the
/// URL without query or fragment.
pub fn entry_name(url: &str) -> &str {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or(url);
    basename(path)
}

/// Downloads whatever the response points at into a readable archive.
/// A missing model download is an error; material and texture downloads
/// that fail are skipped.
pub fn fetch_source<B: GenerationBackend + ?Sized>(
    backend: &B,
    response: &GenerationResponse,
) -> Result<Box<dyn EntrySource>, AppError> {
    match response {
        GenerationResponse::Archive { zip_url } => {
            let bytes = backend.fetch(zip_url)?;
            Ok(Box::new(ZipArchiveSource::from_bytes(bytes)?))
        }
        GenerationResponse::Files {
            obj_url,
            mtl_url,
            textures,
        } => {
            let mut archive = MemoryArchive::new();
            archive.insert(entry_name(obj_url), backend.fetch(obj_url)?);
            for url in mtl_url.iter().chain(textures) {
                match backend.fetch(url) {
                    Ok(bytes) => archive.insert(entry_name(url), bytes),
                    Err(err) => log::warn!("Skipping {}: {}", url, err),
                }
            }
            Ok(Box::new(archive))
        }
    }
}

/// Runs resolver, materializer and rewriter over `source`. Addresses created
/// along the way are recorded in `releases`.
pub fn assemble_archive(
    source: &mut dyn EntrySource,
    variant: Option<&str>,
    store: &mut TransientStore,
    releases: &mut ReleaseList,
) -> BuildInput {
    let roles = classify(source.entry_paths().iter().map(String::as_str), variant);
    let set = materialize(source, &roles, store, releases);
    let material_text = set
        .material_text
        .as_deref()
        .map(|text| rewrite_references(text, set.references()));
    BuildInput::archive(set.model_text, material_text)
        .with_textures(set.textures, set.channels)
        .with_family(variant)
}
