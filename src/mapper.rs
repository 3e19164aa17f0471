//! Free-text description to generation parameters.
//!
//! Each category is a keyword table scanned in definition order; every
//! substring hit overwrites the previous one, so the last matching table
//! entry wins regardless of where it appears in the text.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SHAPE: &str = "Cube";
pub const DEFAULT_TEXTURE: &str = "stone";
pub const DEFAULT_COLOR: &str = "#6952BE";

const SHAPES: &[(&str, &str)] = &[
    ("cube", "Cube"),
    ("sphere", "Sphere"),
    ("ball", "Sphere"),
    ("pyramid", "Pyramid"),
    ("prism", "Prism"),
    ("cylinder", "Cylinder"),
    ("cone", "Cone"),
    ("torus", "Torus"),
];

const TEXTURES: &[(&str, &str)] = &[("metal", "metal"), ("wood", "wood"), ("stone", "stone")];

const COLORS: &[(&str, &str)] = &[
    ("red", "#FF4B4B"),
    ("blue", "#4B69FF"),
    ("green", "#00C976"),
    ("yellow", "#FFD700"),
    ("purple", "#8A70D6"),
    ("orange", "#FF8C42"),
    ("pink", "#FF69B4"),
    ("turquoise", "#00CED1"),
    ("white", "#FFFFFF"),
    ("black", "#000000"),
];

/// The `{shape, color, texture}` body of a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectParams {
    pub shape: String,
    pub color: String,
    pub texture: String,
}

impl Default for ObjectParams {
    fn default() -> Self {
        Self {
            shape: DEFAULT_SHAPE.to_string(),
            color: DEFAULT_COLOR.to_string(),
            texture: DEFAULT_TEXTURE.to_string(),
        }
    }
}

fn last_match(text: &str, table: &[(&str, &str)], default: &str) -> String {
    let mut chosen = default;
    for &(keyword, value) in table {
        if text.contains(keyword) {
            chosen = value;
        }
    }
    chosen.to_string()
}

/// Maps a description onto parameters, starting from `defaults`.
pub fn map_description_with(description: &str, defaults: &ObjectParams) -> ObjectParams {
    let text = description.to_lowercase();
    let params = ObjectParams {
        shape: last_match(&text, SHAPES, &defaults.shape),
        texture: last_match(&text, TEXTURES, &defaults.texture),
        color: last_match(&text, COLORS, &defaults.color),
    };
    log::debug!("Mapped {:?} to {:?}", description, params);
    params
}

pub fn map_description(description: &str) -> ObjectParams {
    map_description_with(description, &ObjectParams::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shiny_blue_metal_sphere() {
        let params = map_description("a shiny blue metal sphere");
        assert_eq!(params.shape, "Sphere");
        assert_eq!(params.texture, "metal");
        assert_eq!(params.color, "#4B69FF");
    }

    #[test]
    fn later_table_entry_wins() {
        let params = map_description("red and then blue cube");
        assert_eq!(params.shape, "Cube");
        assert_eq!(params.color, "#4B69FF");
        // Table order, not text order.
        assert_eq!(map_description("blue and then red").color, "#4B69FF");
    }

    #[test]
    fn defaults_when_nothing_matches() {
        assert_eq!(map_description("something vague"), ObjectParams::default());
        assert_eq!(map_description(""), ObjectParams::default());
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let params = map_description("A WOODEN BALL");
        assert_eq!(params.shape, "Sphere");
        assert_eq!(params.texture, "wood");
    }

    #[test]
    fn custom_defaults() {
        let defaults = ObjectParams {
            shape: "Torus".into(),
            color: "#000000".into(),
            texture: "wood".into(),
        };
        let params = map_description_with("green", &defaults);
        assert_eq!(params.shape, "Torus");
        assert_eq!(params.texture, "wood");
        assert_eq!(params.color, "#00C976");
    }

    #[test]
    fn params_serialize_as_request_body() {
        let json = serde_json::to_value(ObjectParams::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"shape": "Cube", "color": "#6952BE", "texture": "stone"})
        );
    }
}
