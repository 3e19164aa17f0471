//! In-memory fixtures shared by the unit tests.

use std::io::{Cursor, Write};

use zip::write::FileOptions;

/// Builds a ZIP archive from `(path, payload)` pairs. Paths ending in `/`
/// become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    for (name, payload) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(payload).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

/// A small solid-color PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([120, 80, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub const CUBE_OBJ: &str = "\
mtllib model.mtl
o Box
v -2 -1 -4
v 2 -1 -4
v 2 1 -4
v -2 1 -4
v -2 -1 4
v 2 -1 4
v 2 1 4
v -2 1 4
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl Surface
f 1/1 2/2 3/3 4/4
f 5/1 6/2 7/3 8/4
f 1/1 5/2 8/3 4/4
f 2/1 6/2 7/3 3/4
f 4/1 3/2 7/3 8/4
f 1/1 2/2 6/3 5/4
";

pub const CUBE_MTL: &str = "\
newmtl Surface
Kd 0.8 0.8 0.8
Ns 10
map_Kd textures/stone_basecolor.png
";
