//! Primitive meshes for the local preview.
//!
//! All triangles wind counter-clockwise seen from outside, normals point
//! outward. Pyramid and Prism are low-sided cones and cylinders, the way the
//! preview page builds them.

use std::f32::consts::PI;
use std::fmt;

use super::GeometryBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Cube,
    Sphere,
    Pyramid,
    Prism,
    Cylinder,
    Cone,
    Torus,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::Cube,
        ShapeKind::Sphere,
        ShapeKind::Pyramid,
        ShapeKind::Prism,
        ShapeKind::Cylinder,
        ShapeKind::Cone,
        ShapeKind::Torus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Cube => "Cube",
            ShapeKind::Sphere => "Sphere",
            ShapeKind::Pyramid => "Pyramid",
            ShapeKind::Prism => "Prism",
            ShapeKind::Cylinder => "Cylinder",
            ShapeKind::Cone => "Cone",
            ShapeKind::Torus => "Torus",
        }
    }

    /// Case-insensitive lookup; unknown names become a cube.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(ShapeKind::Cube)
    }

    pub fn geometry(self) -> GeometryBuffer {
        match self {
            ShapeKind::Cube => cuboid(2.0, 2.0, 2.0),
            ShapeKind::Sphere => sphere(1.2, 64, 64),
            ShapeKind::Pyramid => frustum(0.0, 1.2, 2.2, 4),
            ShapeKind::Prism => frustum(1.0, 1.0, 2.0, 6),
            ShapeKind::Cylinder => frustum(1.0, 1.0, 2.0, 32),
            ShapeKind::Cone => frustum(0.0, 1.0, 2.0, 32),
            ShapeKind::Torus => torus(1.0, 0.35, 30, 200),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Default)]
struct MeshData {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    uvs: Vec<[f32; 2]>,
    indices: Vec<u32>,
}

impl MeshData {
    fn push(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position);
        self.normals.push(normal);
        self.uvs.push(uv);
        index
    }

    fn finish(self) -> GeometryBuffer {
        GeometryBuffer::new(self.positions, self.normals, self.uvs, self.indices)
    }
}

/// Axis-aligned box centered at the origin. 24 vertices, 36 indices.
pub fn cuboid(width: f32, height: f32, depth: f32) -> GeometryBuffer {
    let half = [width * 0.5, height * 0.5, depth * 0.5];
    // (normal, u axis, v axis)
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let corners = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut mesh = MeshData::default();
    for (normal, u_dir, v_dir) in &faces {
        let base = mesh.positions.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            let mut position = [0.0; 3];
            for axis in 0..3 {
                position[axis] = (normal[axis] + u_dir[axis] * corner[0] + v_dir[axis] * corner[1])
                    * half[axis];
            }
            mesh.push(position, *normal, uv);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh.finish()
}

/// UV sphere: `segments` around the equator, `rings` from pole to pole.
pub fn sphere(radius: f32, segments: u32, rings: u32) -> GeometryBuffer {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = MeshData::default();

    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * PI;
        for seg in 0..=segments {
            let u = seg as f32 / segments as f32;
            let theta = u * 2.0 * PI;
            let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
            mesh.push(
                [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
                [u, v],
            );
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;
            mesh.indices.extend_from_slice(&[current, next, current + 1]);
            mesh.indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }
    mesh.finish()
}

/// Y-aligned cylinder, cone or pyramid. A zero `top_radius` drops the top cap
/// and closes the side at an apex.
pub fn frustum(top_radius: f32, bottom_radius: f32, height: f32, sides: u32) -> GeometryBuffer {
    let sides = sides.max(3);
    let half = height * 0.5;
    let slope = bottom_radius - top_radius;
    let mut mesh = MeshData::default();

    for i in 0..=sides {
        let u = i as f32 / sides as f32;
        let theta = u * 2.0 * PI;
        let (sin, cos) = theta.sin_cos();
        let length = (height * height + slope * slope).sqrt();
        let normal = [cos * height / length, slope / length, sin * height / length];
        mesh.push([cos * top_radius, half, sin * top_radius], normal, [u, 0.0]);
        mesh.push(
            [cos * bottom_radius, -half, sin * bottom_radius],
            normal,
            [u, 1.0],
        );
    }
    for i in 0..sides {
        let top0 = i * 2;
        let (bot0, top1, bot1) = (top0 + 1, top0 + 2, top0 + 3);
        if top_radius > 0.0 {
            mesh.indices
                .extend_from_slice(&[top0, top1, bot1, top0, bot1, bot0]);
        } else {
            mesh.indices.extend_from_slice(&[top0, bot1, bot0]);
        }
    }

    if top_radius > 0.0 {
        cap(&mut mesh, top_radius, half, sides, true);
    }
    if bottom_radius > 0.0 {
        cap(&mut mesh, bottom_radius, -half, sides, false);
    }
    mesh.finish()
}

fn cap(mesh: &mut MeshData, radius: f32, y: f32, sides: u32, up: bool) {
    let normal = if up { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let center = mesh.push([0.0, y, 0.0], normal, [0.5, 0.5]);
    for i in 0..sides {
        let theta = i as f32 / sides as f32 * 2.0 * PI;
        let (sin, cos) = theta.sin_cos();
        mesh.push(
            [cos * radius, y, sin * radius],
            normal,
            [0.5 + cos * 0.5, 0.5 + sin * 0.5],
        );
    }
    for i in 0..sides {
        let current = center + 1 + i;
        let next = center + 1 + (i + 1) % sides;
        if up {
            mesh.indices.extend_from_slice(&[center, next, current]);
        } else {
            mesh.indices.extend_from_slice(&[center, current, next]);
        }
    }
}

/// Torus in the XY plane around the Z axis.
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> GeometryBuffer {
    let radial = radial_segments.max(3);
    let tubular = tubular_segments.max(3);
    let mut mesh = MeshData::default();

    for j in 0..=radial {
        let v = j as f32 / radial as f32 * 2.0 * PI;
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * 2.0 * PI;
            let ring = radius + tube * v.cos();
            let position = [ring * u.cos(), ring * u.sin(), tube * v.sin()];
            let normal = [v.cos() * u.cos(), v.cos() * u.sin(), v.sin()];
            mesh.push(
                position,
                normal,
                [i as f32 / tubular as f32, j as f32 / radial as f32],
            );
        }
    }

    for j in 1..=radial {
        for i in 1..=tubular {
            let a = (tubular + 1) * j + i - 1;
            let b = (tubular + 1) * (j - 1) + i - 1;
            let c = (tubular + 1) * (j - 1) + i;
            let d = (tubular + 1) * j + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh.finish()
}
