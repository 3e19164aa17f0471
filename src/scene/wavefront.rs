//! Wavefront OBJ/MTL loading through `tobj`, mapped onto scene geometry and
//! material definitions.
//!
//! Faces are triangulated and indexed per unique position/uv/normal triple.
//! The material text is handed to the loader for whatever `mtllib` the model
//! names, since archive files are addressed by role rather than by path.

use std::cell::Cell;
use std::io::{BufReader, Read};

use glam::Vec3;

use super::{GeometryBuffer, Rgb, TextureChannel};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("OBJ load failed: {0}")]
    Load(#[from] tobj::LoadError),
    #[error("model contains no faces")]
    Empty,
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Triangles sharing one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGroup {
    pub name: String,
    /// Index into [`WavefrontModel::materials`].
    pub material: Option<usize>,
    pub geometry: GeometryBuffer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDef {
    pub name: String,
    pub diffuse: Option<Rgb>,
    pub shininess: Option<f32>,
    pub opacity: f32,
    /// Map references as written (possibly already rewritten to transient
    /// addresses).
    pub maps: Vec<(TextureChannel, String)>,
}

impl MaterialDef {
    pub fn map(&self, channel: TextureChannel) -> Option<&str> {
        self.maps
            .iter()
            .find(|(candidate, _)| *candidate == channel)
            .map(|(_, reference)| reference.as_str())
    }

    /// Roughness derived from the Phong exponent, 0.6 when absent.
    pub fn roughness(&self) -> f32 {
        match self.shininess {
            Some(ns) => (1.0 - (ns.max(0.0) / 1000.0).sqrt()).clamp(0.04, 1.0),
            None => 0.6,
        }
    }

    fn push_map(&mut self, channel: TextureChannel, value: &str) {
        // Map options come first; the file reference is the last token.
        let Some(reference) = value.split_whitespace().last() else {
            return;
        };
        if self.map(channel).is_none() {
            self.maps.push((channel, reference.to_string()));
        }
    }
}

/// Channels for the map statements `tobj` leaves in `unknown_param`.
fn extra_channel(keyword: &str) -> Option<TextureChannel> {
    match keyword.to_ascii_lowercase().as_str() {
        "norm" | "bump" | "map_bump" => Some(TextureChannel::Normal),
        "map_pr" => Some(TextureChannel::Roughness),
        "map_pm" => Some(TextureChannel::Metallic),
        "map_ao" => Some(TextureChannel::AmbientOcclusion),
        _ => None,
    }
}

impl From<tobj::Material> for MaterialDef {
    fn from(material: tobj::Material) -> Self {
        let mut def = MaterialDef {
            name: material.name,
            diffuse: material.diffuse.map(|[r, g, b]| Rgb::new(r, g, b)),
            shininess: material.shininess,
            opacity: material.dissolve.unwrap_or(1.0),
            maps: Vec::new(),
        };
        let known = [
            (TextureChannel::Diffuse, material.diffuse_texture),
            (TextureChannel::Normal, material.normal_texture),
            (TextureChannel::AmbientOcclusion, material.ambient_texture),
        ];
        for (channel, value) in known {
            if let Some(value) = value {
                def.push_map(channel, &value);
            }
        }
        let mut extra: Vec<(&String, &String)> = material.unknown_param.iter().collect();
        extra.sort();
        for (keyword, value) in extra {
            if let Some(channel) = extra_channel(keyword) {
                def.push_map(channel, value);
            }
        }
        def
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WavefrontModel {
    pub groups: Vec<MeshGroup>,
    pub materials: Vec<MaterialDef>,
}

/// Area-weighted vertex normals.
fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let pa = Vec3::from_array(positions[a]);
        let face = (Vec3::from_array(positions[b]) - pa).cross(Vec3::from_array(positions[c]) - pa);
        for index in [a, b, c] {
            sums[index] += face;
        }
    }
    sums.into_iter()
        .map(|sum| sum.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

fn geometry(mesh: tobj::Mesh) -> GeometryBuffer {
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let count = positions.len();
    let uvs = if mesh.texcoords.len() == count * 2 {
        mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect()
    } else {
        vec![[0.0, 0.0]; count]
    };
    let normals = if mesh.normals.len() == count * 3 {
        mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
    } else {
        smooth_normals(&positions, &mesh.indices)
    };
    GeometryBuffer::new(positions, normals, uvs, mesh.indices)
}

/// Loads `model_text`, binding `usemtl` statements against `material_text`.
///
/// A material file that fails to load is logged and dropped; the groups are
/// then returned without materials.
pub fn load(model_text: &str, material_text: Option<&str>) -> Result<WavefrontModel> {
    let names_library = model_text
        .lines()
        .any(|line| line.trim_start().starts_with("mtllib"));
    let prefix: &[u8] = if material_text.is_some() && !names_library {
        b"mtllib model.mtl\n"
    } else {
        b""
    };
    let mut reader = BufReader::new(prefix.chain(model_text.as_bytes()));

    let supplied = Cell::new(false);
    let (models, materials) = tobj::load_obj_buf(&mut reader, &tobj::GPU_LOAD_OPTIONS, |path| {
        match material_text {
            Some(text) if !supplied.replace(true) => {
                log::debug!("Material library {} taken from the archive", path.display());
                tobj::load_mtl_buf(&mut text.as_bytes())
            }
            _ => Ok((Vec::new(), Default::default())),
        }
    })?;

    let materials: Vec<MaterialDef> = match materials {
        Ok(materials) => materials.into_iter().map(MaterialDef::from).collect(),
        Err(err) => {
            log::warn!("Material file unusable ({}), building ungrouped", err);
            Vec::new()
        }
    };

    let groups: Vec<MeshGroup> = models
        .into_iter()
        .filter(|model| !model.mesh.indices.is_empty())
        .map(|model| MeshGroup {
            material: model.mesh.material_id.filter(|&id| id < materials.len()),
            name: model.name,
            geometry: geometry(model.mesh),
        })
        .collect();
    if groups.is_empty() {
        return Err(ModelError::Empty);
    }

    log::debug!(
        "Loaded OBJ: {} groups, {} materials",
        groups.len(),
        materials.len()
    );
    Ok(WavefrontModel { groups, materials })
}
