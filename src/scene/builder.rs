//! Turns resolved model, material and texture data into a [`SceneObject`].

use crate::assets::{MaterializedTexture, ReleaseList, Role, TransientAddress, TransientStore};

use super::shapes::{cuboid, ShapeKind};
use super::wavefront::{self, MaterialDef};
use super::{
    Material, MeshNode, ObjectSource, Rgb, SceneObject, TextureBinding, TextureChannel,
};

/// What the object is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A primitive chosen in the UI, optionally skinned with archive textures.
    LocalPreview(ShapeKind),
    /// Model and material files returned by the generation backend.
    Archive,
}

#[derive(Debug, Clone)]
pub struct BuildInput {
    pub model_text: Option<String>,
    /// Material text with file references already rewritten to transient
    /// addresses.
    pub material_text: Option<String>,
    /// Materialized images in archive order.
    pub textures: Vec<MaterializedTexture>,
    pub channels: Vec<(Role, TransientAddress)>,
    pub color: Option<Rgb>,
    /// Requested surface family (`stone`, `metal`, `wood`, ...).
    pub family: Option<String>,
    pub origin: Origin,
}

impl BuildInput {
    pub fn local(shape: ShapeKind, color: Rgb) -> Self {
        Self {
            model_text: None,
            material_text: None,
            textures: Vec::new(),
            channels: Vec::new(),
            color: Some(color),
            family: None,
            origin: Origin::LocalPreview(shape),
        }
    }

    pub fn archive(model_text: Option<String>, material_text: Option<String>) -> Self {
        Self {
            model_text,
            material_text,
            textures: Vec::new(),
            channels: Vec::new(),
            color: None,
            family: None,
            origin: Origin::Archive,
        }
    }

    pub fn with_textures(
        mut self,
        textures: Vec<MaterializedTexture>,
        channels: Vec<(Role, TransientAddress)>,
    ) -> Self {
        self.textures = textures;
        self.channels = channels;
        self
    }

    pub fn with_family(mut self, family: Option<&str>) -> Self {
        self.family = family.map(str::to_lowercase);
        self
    }

    fn texture(&self, address: &TransientAddress) -> Option<&MaterializedTexture> {
        self.textures.iter().find(|texture| &texture.address == address)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("texture {0} was revoked before the build finished")]
    RevokedTexture(TransientAddress),
    #[error("model geometry has non-finite coordinates")]
    NonFiniteGeometry,
}

/// Surface parameters per texture family.
pub fn family_parameters(family: Option<&str>) -> (f32, f32) {
    let metalness = if family == Some("metal") { 1.0 } else { 0.0 };
    let roughness = match family {
        Some("stone") => 1.0,
        Some("wood") => 0.8,
        _ => 0.4,
    };
    (metalness, roughness)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBuilder {
    pub target_size: f32,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self { target_size: 2.0 }
    }
}

impl SceneBuilder {
    pub fn new(target_size: f32) -> Self {
        Self { target_size }
    }

    /// Builds the object and hands it ownership of every address in
    /// `releases`. On error those addresses are revoked before returning.
    pub fn build(
        &self,
        input: BuildInput,
        store: &mut TransientStore,
        releases: ReleaseList,
    ) -> Result<SceneObject, BuildError> {
        match self.assemble(&input, store) {
            Ok(mut object) => {
                object.adopt_transient(releases.into_addresses());
                log::info!(
                    "Built '{}' ({:?}, {} nodes, {} materials, scale {:.3})",
                    object.name,
                    object.source,
                    object.nodes.len(),
                    object.materials.len(),
                    object.transform.uniform_scale
                );
                Ok(object)
            }
            Err(err) => {
                let released = releases.release_all(store);
                log::warn!("Build failed ({}), released {} textures", err, released);
                Err(err)
            }
        }
    }

    fn assemble(&self, input: &BuildInput, store: &TransientStore) -> Result<SceneObject, BuildError> {
        for texture in &input.textures {
            if store.resolve(&texture.address).is_none() {
                return Err(BuildError::RevokedTexture(texture.address.clone()));
            }
        }
        for (_, address) in &input.channels {
            if store.resolve(address).is_none() {
                return Err(BuildError::RevokedTexture(address.clone()));
            }
        }

        let mut object = match input.origin {
            Origin::LocalPreview(shape) => self.primitive(shape, input),
            Origin::Archive => self.parsed(input, store),
        };

        if let Some(color) = input.color {
            for material in &mut object.materials {
                material.color = color;
            }
        }
        for index in 0..object.materials.len() {
            if object.materials[index]
                .texture(TextureChannel::AmbientOcclusion)
                .is_some()
            {
                for node in object.nodes.iter_mut().filter(|node| node.material == Some(index)) {
                    node.geometry.ensure_uv2();
                }
            }
        }

        let non_finite = object.nodes.iter().any(|node| {
            node.geometry
                .positions
                .iter()
                .flatten()
                .any(|value| !value.is_finite())
        });
        if non_finite {
            return Err(BuildError::NonFiniteGeometry);
        }

        self.normalize(&mut object);
        Ok(object)
    }

    fn primitive(&self, shape: ShapeKind, input: &BuildInput) -> SceneObject {
        let node = MeshNode {
            name: shape.name().to_string(),
            geometry: shape.geometry(),
            material: Some(0),
        };
        SceneObject::new(
            shape.name(),
            vec![node],
            vec![self.channel_material(input)],
            ObjectSource::Local(shape),
        )
    }

    fn fallback(&self, input: &BuildInput) -> SceneObject {
        let node = MeshNode {
            name: "fallback-cube".to_string(),
            geometry: cuboid(2.0, 2.0, 2.0),
            material: Some(0),
        };
        SceneObject::new(
            "fallback-cube",
            vec![node],
            vec![self.channel_material(input)],
            ObjectSource::Fallback,
        )
    }

    fn parsed(&self, input: &BuildInput, store: &TransientStore) -> SceneObject {
        let Some(model_text) = input.model_text.as_deref() else {
            log::warn!("No model in the response, using the fallback cube");
            return self.fallback(input);
        };
        let model = match wavefront::load(model_text, input.material_text.as_deref()) {
            Ok(model) => model,
            Err(err) => {
                log::warn!("Model unusable ({}), using the fallback cube", err);
                return self.fallback(input);
            }
        };

        let name = model
            .groups
            .iter()
            .map(|group| group.name.as_str())
            .find(|name| !name.is_empty() && !matches!(*name, "default" | "unnamed_object"))
            .unwrap_or("model")
            .to_string();

        let mut nodes = Vec::with_capacity(model.groups.len());
        let materials = if model.materials.is_empty() {
            for group in model.groups {
                nodes.push(MeshNode {
                    name: group.name,
                    geometry: group.geometry,
                    material: Some(0),
                });
            }
            vec![self.channel_material(input)]
        } else {
            let mut materials: Vec<Material> = model
                .materials
                .iter()
                .map(|definition| self.mtl_material(definition, store))
                .collect();
            let mut unbound: Option<usize> = None;
            for group in model.groups {
                let index = match group.material {
                    Some(index) => index,
                    None => *unbound.get_or_insert_with(|| {
                        materials.push(Material::new("default", Rgb::WHITE));
                        materials.len() - 1
                    }),
                };
                nodes.push(MeshNode {
                    name: group.name,
                    geometry: group.geometry,
                    material: Some(index),
                });
            }
            materials
        };
        SceneObject::new(name, nodes, materials, ObjectSource::ServerParsed)
    }

    fn mtl_material(&self, definition: &MaterialDef, store: &TransientStore) -> Material {
        let mut material = Material::new(
            definition.name.clone(),
            definition.diffuse.unwrap_or(Rgb::WHITE),
        );
        material.roughness = definition.roughness();
        material.opacity = definition.opacity;
        for (channel, reference) in &definition.maps {
            match store.resolve_str(reference) {
                Some((address, payload)) => material.bind(TextureBinding {
                    channel: *channel,
                    address: address.clone(),
                    width: payload.width,
                    height: payload.height,
                }),
                None => log::warn!(
                    "Material '{}' references missing texture {}",
                    definition.name,
                    reference
                ),
            }
        }
        material
    }

    /// The single material used when there is no material file: the first
    /// available texture as diffuse plus any classified channels.
    fn channel_material(&self, input: &BuildInput) -> Material {
        let mut material = Material::new("surface", Rgb::WHITE);
        if let Some(family) = input.family.as_deref() {
            let (metalness, roughness) = family_parameters(Some(family));
            material.metalness = metalness;
            material.roughness = roughness;
        }

        let diffuse = input
            .channels
            .iter()
            .find(|(role, _)| *role == Role::Diffuse)
            .and_then(|(_, address)| input.texture(address))
            .or_else(|| input.textures.first());
        if let Some(texture) = diffuse {
            material.bind(binding(TextureChannel::Diffuse, texture));
        }
        for (role, address) in &input.channels {
            let Some(channel) = TextureChannel::from_role(*role) else {
                continue;
            };
            if channel == TextureChannel::Diffuse {
                continue;
            }
            if let Some(texture) = input.texture(address) {
                material.bind(binding(channel, texture));
            }
        }
        material
    }

    /// Scales the object so its largest dimension equals the target size and
    /// moves its bounds center to the origin.
    pub fn normalize(&self, object: &mut SceneObject) {
        let Some((min, max)) = object.local_bounds() else {
            return;
        };
        let size = max - min;
        let center = (min + max) * 0.5;
        let max_dim = size.max_element();
        let scale = if max_dim > 0.0 {
            self.target_size / max_dim
        } else {
            1.0
        };
        object.transform.uniform_scale = scale;
        object.transform.position = -center * scale;
    }
}

fn binding(channel: TextureChannel, texture: &MaterializedTexture) -> TextureBinding {
    TextureBinding {
        channel,
        address: texture.address.clone(),
        width: texture.width,
        height: texture.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{
        classify, materialize, rewrite_references, EntrySource, MemoryArchive,
    };
    use crate::scene::Provenance;
    use crate::test_support::{png_bytes, CUBE_MTL, CUBE_OBJ};
    use glam::Vec3;

    fn texture(store: &mut TransientStore, releases: &mut ReleaseList, path: &str) -> MaterializedTexture {
        let address = store.create(path, png_bytes(2, 2), 2, 2);
        releases.record(address.clone());
        MaterializedTexture {
            path: path.to_string(),
            address,
            width: 2,
            height: 2,
        }
    }

    #[test]
    fn normalizes_to_target_size_and_centers() {
        let mut store = TransientStore::new();
        let input = BuildInput::archive(Some(CUBE_OBJ.to_string()), None);
        let object = SceneBuilder::new(2.0)
            .build(input, &mut store, ReleaseList::new())
            .unwrap();

        assert_eq!(object.transform.uniform_scale, 0.25);
        let (min, max) = object.placed_bounds().unwrap();
        let center = (min + max) * 0.5;
        assert!(center.length() < 1e-6);
        assert_eq!(max - min, Vec3::new(1.0, 0.5, 2.0));
    }

    #[test]
    fn binds_rewritten_material_maps() {
        let mut archive = MemoryArchive::new();
        archive.insert("model.obj", CUBE_OBJ.as_bytes().to_vec());
        archive.insert("model.mtl", CUBE_MTL.as_bytes().to_vec());
        archive.insert("textures/stone_basecolor.png", png_bytes(4, 4));

        let roles = classify(archive.entry_paths().iter().map(String::as_str), Some("stone"));
        let mut store = TransientStore::new();
        let mut releases = ReleaseList::new();
        let set = materialize(&mut archive, &roles, &mut store, &mut releases);
        let material_text = set
            .material_text
            .as_deref()
            .map(|text| rewrite_references(text, set.references()));
        assert!(!material_text.as_deref().unwrap().contains("stone_basecolor.png"));

        let input = BuildInput::archive(set.model_text.clone(), material_text)
            .with_textures(set.textures.clone(), set.channels.clone());
        let object = SceneBuilder::default()
            .build(input, &mut store, releases)
            .unwrap();

        assert_eq!(object.source, ObjectSource::ServerParsed);
        assert_eq!(object.materials.len(), 1);
        let material = &object.materials[0];
        assert_eq!(material.name, "Surface");
        let diffuse = material.texture(TextureChannel::Diffuse).unwrap();
        assert_eq!((diffuse.width, diffuse.height), (4, 4));
        assert_eq!(object.transient_addresses().len(), 1);
    }

    #[test]
    fn image_only_input_becomes_textured_fallback_cube() {
        let mut store = TransientStore::new();
        let mut releases = ReleaseList::new();
        let wood = texture(&mut store, &mut releases, "wood.png");

        let input = BuildInput::archive(None, None).with_textures(vec![wood.clone()], Vec::new());
        let object = SceneBuilder::default()
            .build(input, &mut store, releases)
            .unwrap();

        assert_eq!(object.source, ObjectSource::Fallback);
        assert_eq!(object.provenance(), Provenance::Local);
        let diffuse = object.materials[0].texture(TextureChannel::Diffuse).unwrap();
        assert_eq!(diffuse.address, wood.address);
        assert_eq!(object.transform.uniform_scale, 1.0);
    }

    #[test]
    fn unparsable_model_falls_back() {
        let mut store = TransientStore::new();
        let input = BuildInput::archive(Some("this is not obj".into()), None);
        let object = SceneBuilder::default()
            .build(input, &mut store, ReleaseList::new())
            .unwrap();
        assert_eq!(object.source, ObjectSource::Fallback);
        assert!(object.materials[0].textures.is_empty());
    }

    #[test]
    fn broken_material_builds_ungrouped() {
        let mut store = TransientStore::new();
        let input = BuildInput::archive(Some(CUBE_OBJ.into()), Some("Kd 1 1 1\n".into()));
        let object = SceneBuilder::default()
            .build(input, &mut store, ReleaseList::new())
            .unwrap();
        assert_eq!(object.source, ObjectSource::ServerParsed);
        assert_eq!(object.materials.len(), 1);
        assert_eq!(object.materials[0].name, "surface");
    }

    #[test]
    fn channels_and_family_parameters_without_material_file() {
        let mut store = TransientStore::new();
        let mut releases = ReleaseList::new();
        let color = texture(&mut store, &mut releases, "metal_color.png");
        let ao = texture(&mut store, &mut releases, "metal_ao.png");
        let channels = vec![
            (Role::Diffuse, color.address.clone()),
            (Role::AmbientOcclusion, ao.address.clone()),
        ];

        let input = BuildInput::archive(Some(CUBE_OBJ.into()), None)
            .with_textures(vec![ao.clone(), color.clone()], channels)
            .with_family(Some("Metal"));
        let object = SceneBuilder::default()
            .build(input, &mut store, releases)
            .unwrap();

        let material = &object.materials[0];
        assert_eq!(material.metalness, 1.0);
        assert_eq!(material.roughness, 0.4);
        // The classified diffuse wins over the first image in archive order.
        assert_eq!(
            material.texture(TextureChannel::Diffuse).unwrap().address,
            color.address
        );
        assert!(material.texture(TextureChannel::AmbientOcclusion).is_some());
        let geometry = &object.nodes[0].geometry;
        assert_eq!(geometry.uv2.as_ref(), Some(&geometry.uvs));
    }

    #[test]
    fn local_preview_applies_color() {
        let mut store = TransientStore::new();
        let red = Rgb::from_hex("#FF4B4B").unwrap();
        let object = SceneBuilder::default()
            .build(
                BuildInput::local(ShapeKind::Torus, red),
                &mut store,
                ReleaseList::new(),
            )
            .unwrap();
        assert_eq!(object.source, ObjectSource::Local(ShapeKind::Torus));
        assert_eq!(object.materials[0].color, red);
        let (min, max) = object.placed_bounds().unwrap();
        assert!(((max - min).max_element() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn failed_build_releases_its_addresses() {
        let mut store = TransientStore::new();
        let mut releases = ReleaseList::new();
        let wood = texture(&mut store, &mut releases, "wood.png");
        let input = BuildInput::archive(Some("v NaN 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n".into()), None)
            .with_textures(vec![wood], Vec::new());

        let result = SceneBuilder::default().build(input, &mut store, releases);

        assert_eq!(result.unwrap_err(), BuildError::NonFiniteGeometry);
        assert_eq!(store.outstanding(), 0);
    }

    #[test]
    fn family_table() {
        assert_eq!(family_parameters(Some("metal")), (1.0, 0.4));
        assert_eq!(family_parameters(Some("stone")), (0.0, 1.0));
        assert_eq!(family_parameters(Some("wood")), (0.0, 0.8));
        assert_eq!(family_parameters(None), (0.0, 0.4));
        assert_eq!(family_parameters(Some("gunmetal-wood")), (0.0, 0.4));
    }
}
