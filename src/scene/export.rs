//! Writes the current object back out as a self-contained ZIP:
//! `model.obj`, `model.mtl` and `textures/<name>` for every bound texture.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::FileOptions;

use crate::assets::{basename, TransientAddress, TransientStore};

use super::SceneObject;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("texture {0} is no longer available")]
    MissingTexture(TransientAddress),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("formatting error")]
    Format(#[from] std::fmt::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

pub const MODEL_ENTRY: &str = "model.obj";
pub const MATERIAL_ENTRY: &str = "model.mtl";

/// Archive paths for every distinct texture address, unique even when two
/// payloads share a basename.
fn texture_paths(
    object: &SceneObject,
    store: &TransientStore,
) -> Result<Vec<(TransientAddress, String)>> {
    let mut paths: Vec<(TransientAddress, String)> = Vec::new();
    let mut taken: HashMap<String, usize> = HashMap::new();
    for binding in object.materials.iter().flat_map(|m| m.textures.iter()) {
        if paths.iter().any(|(address, _)| *address == binding.address) {
            continue;
        }
        let payload = store
            .resolve(&binding.address)
            .ok_or_else(|| ExportError::MissingTexture(binding.address.clone()))?;
        let name = basename(&payload.name).to_string();
        let seen = taken.entry(name.clone()).or_insert(0);
        *seen += 1;
        let unique = if *seen == 1 {
            name
        } else {
            format!("{}_{}", seen, name)
        };
        paths.push((binding.address.clone(), format!("textures/{unique}")));
    }
    Ok(paths)
}

pub fn write_obj(object: &SceneObject) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "# {}", object.name)?;
    writeln!(out, "mtllib {MATERIAL_ENTRY}")?;
    let mut offset = 1usize;
    for node in &object.nodes {
        let geometry = &node.geometry;
        writeln!(out, "o {}", node.name)?;
        if let Some(material) = object.material_for(node) {
            writeln!(out, "usemtl {}", material.name)?;
        }
        for [x, y, z] in &geometry.positions {
            writeln!(out, "v {x} {y} {z}")?;
        }
        for [u, v] in &geometry.uvs {
            writeln!(out, "vt {u} {v}")?;
        }
        for [x, y, z] in &geometry.normals {
            writeln!(out, "vn {x} {y} {z}")?;
        }
        for triangle in geometry.indices.chunks_exact(3) {
            out.push('f');
            for index in triangle {
                let i = *index as usize + offset;
                write!(out, " {i}/{i}/{i}")?;
            }
            out.push('\n');
        }
        offset += geometry.vertex_count();
    }
    Ok(out)
}

pub fn write_mtl(
    object: &SceneObject,
    texture_paths: &[(TransientAddress, String)],
) -> Result<String> {
    let mut out = String::new();
    for material in &object.materials {
        let [r, g, b] = material.color.to_array();
        writeln!(out, "newmtl {}", material.name)?;
        writeln!(out, "Kd {r} {g} {b}")?;
        writeln!(out, "d {}", material.opacity)?;
        writeln!(out, "Pr {}", material.roughness)?;
        writeln!(out, "Pm {}", material.metalness)?;
        for binding in &material.textures {
            if let Some((_, path)) = texture_paths.iter().find(|(a, _)| *a == binding.address) {
                writeln!(out, "{} {}", binding.channel.mtl_keyword(), path)?;
            }
        }
        out.push('\n');
    }
    Ok(out)
}

pub fn export_object(object: &SceneObject, store: &TransientStore) -> Result<Vec<u8>> {
    let textures = texture_paths(object, store)?;
    let model = write_obj(object)?;
    let material = write_mtl(object, &textures)?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    zip.start_file(MODEL_ENTRY, options)?;
    zip.write_all(model.as_bytes())?;
    zip.start_file(MATERIAL_ENTRY, options)?;
    zip.write_all(material.as_bytes())?;
    for (address, path) in &textures {
        let payload = store
            .resolve(address)
            .ok_or_else(|| ExportError::MissingTexture(address.clone()))?;
        zip.start_file(path.as_str(), options)?;
        zip.write_all(&payload.bytes)?;
    }
    let bytes = zip.finish()?.into_inner();
    log::info!(
        "Exported '{}' ({} textures, {} bytes)",
        object.name,
        textures.len(),
        bytes.len()
    );
    Ok(bytes)
}

pub fn export_to_file(object: &SceneObject, store: &TransientStore, path: &Path) -> Result<()> {
    let bytes = export_object(object, store)?;
    std::fs::write(path, bytes)?;
    Ok(())
}
