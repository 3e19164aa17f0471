pub mod builder;
pub mod export;
pub mod shapes;
pub mod slot;
pub mod wavefront;

use crate::assets::{Role, TransientAddress, TransientStore};
use glam::{EulerRot, Mat4, Quat, Vec3};

pub use builder::{BuildInput, Origin, SceneBuilder};
pub use shapes::ShapeKind;
pub use slot::{BuildTicket, CommitOutcome, ObjectSlot, SlotState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid color {value:?}: expected #RRGGBB")]
pub struct ColorParseError {
    pub value: String,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let err = || ColorParseError {
            value: value.to_string(),
        };
        let digits = value.trim().strip_prefix('#').ok_or_else(err)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(err());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| err())
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02X}{:02X}{:02X}", byte(self.r), byte(self.g), byte(self.b))
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// CPU-side vertex data for one mesh node. Disposal drops the buffers; a
/// disposed buffer stays empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffer {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    /// Second UV set, required by ambient-occlusion maps.
    pub uv2: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    disposed: bool,
}

impl GeometryBuffer {
    pub fn new(
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        uvs: Vec<[f32; 2]>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            positions,
            normals,
            uvs,
            uv2: None,
            indices,
            disposed: false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn ensure_uv2(&mut self) {
        if self.uv2.is_none() {
            self.uv2 = Some(self.uvs.clone());
        }
    }

    /// Axis-aligned bounds as (min, max), `None` for empty geometry.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Returns false when the buffer was already disposed.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.positions = Vec::new();
        self.normals = Vec::new();
        self.uvs = Vec::new();
        self.uv2 = None;
        self.indices = Vec::new();
        self.disposed = true;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureChannel {
    Diffuse,
    Normal,
    Roughness,
    Metallic,
    AmbientOcclusion,
}

impl TextureChannel {
    pub fn from_role(role: Role) -> Option<Self> {
        match role {
            Role::Diffuse => Some(Self::Diffuse),
            Role::Normal => Some(Self::Normal),
            Role::Roughness => Some(Self::Roughness),
            Role::Metallic => Some(Self::Metallic),
            Role::AmbientOcclusion => Some(Self::AmbientOcclusion),
            Role::Model | Role::Material => None,
        }
    }

    /// Material-file statement used when writing this channel back out.
    pub fn mtl_keyword(self) -> &'static str {
        match self {
            Self::Diffuse => "map_Kd",
            Self::Normal => "norm",
            Self::Roughness => "map_Pr",
            Self::Metallic => "map_Pm",
            Self::AmbientOcclusion => "map_ao",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    pub channel: TextureChannel,
    pub address: TransientAddress,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub textures: Vec<TextureBinding>,
    disposed: bool,
}

impl Material {
    pub fn new(name: impl Into<String>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            color,
            metalness: 0.0,
            roughness: 0.6,
            opacity: 1.0,
            textures: Vec::new(),
            disposed: false,
        }
    }

    pub fn texture(&self, channel: TextureChannel) -> Option<&TextureBinding> {
        self.textures
            .iter()
            .find(|binding| binding.channel == channel)
    }

    pub fn bind(&mut self, binding: TextureBinding) {
        self.textures.retain(|existing| existing.channel != binding.channel);
        self.textures.push(binding);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Releases the material and its texture bindings. Returns the number of
    /// textures dropped, or `None` when already disposed.
    pub fn dispose(&mut self) -> Option<usize> {
        if self.disposed {
            return None;
        }
        let textures = self.textures.len();
        self.textures.clear();
        self.disposed = true;
        Some(textures)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub name: String,
    pub geometry: GeometryBuffer,
    /// Index into the owning object's materials.
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vec3,
    pub uniform_scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            uniform_scale: 1.0,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.uniform_scale),
            rotation,
            self.position,
        )
    }
}

/// Where a scene object's geometry came from. Decides which later edits the
/// object accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSource {
    /// A locally previewed primitive.
    Local(ShapeKind),
    /// Built from backend-supplied model and material files.
    ServerParsed,
    /// The last-resort cube used when no model was usable.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Local,
    ServerGenerated,
}

impl ObjectSource {
    pub fn provenance(self) -> Provenance {
        match self {
            ObjectSource::Local(_) | ObjectSource::Fallback => Provenance::Local,
            ObjectSource::ServerParsed => Provenance::ServerGenerated,
        }
    }

    /// Color and rotation edits only apply to objects whose look is not baked
    /// into a received material.
    pub fn accepts_edits(self) -> bool {
        match self {
            ObjectSource::Local(_) | ObjectSource::Fallback => true,
            ObjectSource::ServerParsed => false,
        }
    }
}

/// What a teardown released, step by step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub geometries: usize,
    pub materials: usize,
    pub textures: usize,
    pub revoked: usize,
    pub failures: Vec<String>,
}

#[derive(Debug)]
pub struct SceneObject {
    pub name: String,
    pub nodes: Vec<MeshNode>,
    pub materials: Vec<Material>,
    pub transform: Transform,
    pub source: ObjectSource,
    transient: Vec<TransientAddress>,
}

impl SceneObject {
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<MeshNode>,
        materials: Vec<Material>,
        source: ObjectSource,
    ) -> Self {
        Self {
            name: name.into(),
            nodes,
            materials,
            transform: Transform::default(),
            source,
            transient: Vec::new(),
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.source.provenance()
    }

    pub fn adopt_transient(&mut self, addresses: impl IntoIterator<Item = TransientAddress>) {
        self.transient.extend(addresses);
    }

    pub fn transient_addresses(&self) -> &[TransientAddress] {
        &self.transient
    }

    pub fn vertex_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.geometry.vertex_count())
            .sum()
    }

    pub fn material_for(&self, node: &MeshNode) -> Option<&Material> {
        node.material.and_then(|index| self.materials.get(index))
    }

    /// Bounds of the untransformed geometry.
    pub fn local_bounds(&self) -> Option<(Vec3, Vec3)> {
        self.nodes
            .iter()
            .filter_map(|node| node.geometry.bounds())
            .reduce(|(amin, amax), (bmin, bmax)| (amin.min(bmin), amax.max(bmax)))
    }

    /// Bounds after scale and translation (rotation ignored).
    pub fn placed_bounds(&self) -> Option<(Vec3, Vec3)> {
        let (min, max) = self.local_bounds()?;
        let scale = self.transform.uniform_scale;
        Some((
            min * scale + self.transform.position,
            max * scale + self.transform.position,
        ))
    }

    /// Sets the diffuse color of every material. Suppressed for objects whose
    /// color is baked into a received material.
    pub fn set_color(&mut self, color: Rgb) -> bool {
        if !self.source.accepts_edits() {
            log::debug!("Ignoring color edit on server-generated '{}'", self.name);
            return false;
        }
        for material in &mut self.materials {
            material.color = color;
        }
        true
    }

    pub fn rotate(&mut self, delta: Vec3) -> bool {
        if !self.source.accepts_edits() {
            return false;
        }
        self.transform.rotation += delta;
        true
    }

    /// Disposes geometry, then materials and their textures, then revokes the
    /// transient addresses. Every step runs even if an earlier one reported a
    /// failure.
    pub fn teardown(mut self, store: &mut TransientStore) -> TeardownReport {
        let mut report = TeardownReport::default();
        for node in &mut self.nodes {
            if node.geometry.dispose() {
                report.geometries += 1;
            } else {
                report
                    .failures
                    .push(format!("geometry of '{}' already disposed", node.name));
            }
        }
        for material in &mut self.materials {
            match material.dispose() {
                Some(textures) => {
                    report.materials += 1;
                    report.textures += textures;
                }
                None => report
                    .failures
                    .push(format!("material '{}' already disposed", material.name)),
            }
        }
        for address in self.transient.drain(..) {
            match store.revoke(&address) {
                Ok(()) => report.revoked += 1,
                Err(err) => report.failures.push(err.to_string()),
            }
        }
        for failure in &report.failures {
            log::warn!("Teardown of '{}': {}", self.name, failure);
        }
        report
    }
}
