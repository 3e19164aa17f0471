//! Assigns archive entries to semantic roles from their filenames.
//!
//! Each role holds at most one entry. Assignment is first-match in archive
//! iteration order; a desired variant (usually the requested texture family)
//! gets a priority sweep before the generic one.

use super::ArchiveEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Model,
    Material,
    Diffuse,
    Normal,
    Roughness,
    Metallic,
    AmbientOcclusion,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Model,
        Role::Material,
        Role::Diffuse,
        Role::Normal,
        Role::Roughness,
        Role::Metallic,
        Role::AmbientOcclusion,
    ];

    pub const TEXTURES: [Role; 5] = [
        Role::Diffuse,
        Role::Normal,
        Role::Roughness,
        Role::Metallic,
        Role::AmbientOcclusion,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Role::Model | Role::Material => &[],
            Role::Diffuse => &["diffuse", "albedo", "color", "basecolor"],
            Role::Normal => &["normal", "normal-ogl", "nrm"],
            Role::Roughness => &["roughness", "rough"],
            Role::Metallic => &["metal", "metallic"],
            Role::AmbientOcclusion => &["ao", "ambient"],
        }
    }

    pub fn is_texture(self) -> bool {
        !matches!(self, Role::Model | Role::Material)
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Model => "model",
            Role::Material => "material",
            Role::Diffuse => "diffuse",
            Role::Normal => "normal",
            Role::Roughness => "roughness",
            Role::Metallic => "metallic",
            Role::AmbientOcclusion => "ao",
        }
    }

    fn matches(self, entry: &ArchiveEntry) -> bool {
        match self {
            Role::Model => entry.lowercased_path.ends_with(".obj"),
            Role::Material => entry.lowercased_path.ends_with(".mtl"),
            _ => entry.is_image() && self.has_keyword(&entry.lowercased_path),
        }
    }

    fn has_keyword(self, lowercased: &str) -> bool {
        self.keywords()
            .iter()
            .any(|keyword| lowercased.contains(keyword))
    }
}

/// Role → entry path. Unassigned roles are a normal state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleClassification {
    model: Option<String>,
    material: Option<String>,
    diffuse: Option<String>,
    normal: Option<String>,
    roughness: Option<String>,
    metallic: Option<String>,
    ambient_occlusion: Option<String>,
}

impl RoleClassification {
    pub fn get(&self, role: Role) -> Option<&str> {
        self.slot(role).as_deref()
    }

    pub fn is_empty(&self) -> bool {
        Role::ALL.iter().all(|role| self.get(*role).is_none())
    }

    /// Assigned texture roles in channel order.
    pub fn textures(&self) -> impl Iterator<Item = (Role, &str)> + '_ {
        Role::TEXTURES
            .into_iter()
            .filter_map(move |role| self.get(role).map(|path| (role, path)))
    }

    fn slot(&self, role: Role) -> &Option<String> {
        match role {
            Role::Model => &self.model,
            Role::Material => &self.material,
            Role::Diffuse => &self.diffuse,
            Role::Normal => &self.normal,
            Role::Roughness => &self.roughness,
            Role::Metallic => &self.metallic,
            Role::AmbientOcclusion => &self.ambient_occlusion,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<String> {
        match role {
            Role::Model => &mut self.model,
            Role::Material => &mut self.material,
            Role::Diffuse => &mut self.diffuse,
            Role::Normal => &mut self.normal,
            Role::Roughness => &mut self.roughness,
            Role::Metallic => &mut self.metallic,
            Role::AmbientOcclusion => &mut self.ambient_occlusion,
        }
    }

    fn fill_if_empty(&mut self, role: Role, path: &str) {
        let slot = self.slot_mut(role);
        if slot.is_none() {
            log::debug!("Role {} -> {}", role.label(), path);
            *slot = Some(path.to_string());
        }
    }

    fn sweep<'a>(
        &mut self,
        entries: impl Iterator<Item = &'a ArchiveEntry>,
    ) {
        for entry in entries {
            for role in Role::ALL {
                if role.matches(entry) {
                    self.fill_if_empty(role, &entry.path);
                }
            }
        }
    }
}

pub fn classify<'a, I>(paths: I, desired_variant: Option<&str>) -> RoleClassification
where
    I: IntoIterator<Item = &'a str>,
{
    let entries: Vec<ArchiveEntry> = paths
        .into_iter()
        .map(ArchiveEntry::new)
        .filter(|entry| !entry.is_skippable())
        .collect();
    let variant = desired_variant
        .map(str::to_lowercase)
        .filter(|variant| !variant.is_empty());

    let mut roles = RoleClassification::default();
    if let Some(variant) = &variant {
        roles.sweep(
            entries
                .iter()
                .filter(|entry| entry.lowercased_path.contains(variant.as_str())),
        );
    }
    roles.sweep(entries.iter());

    // Last chance for a variant-tagged color map in a format the sweeps skip.
    if let Some(variant) = &variant {
        if roles.diffuse.is_none() {
            let fallback = entries.iter().find(|entry| {
                entry.payload_kind == super::PayloadKind::Binary
                    && entry.lowercased_path.contains(variant.as_str())
                    && Role::Diffuse.has_keyword(&entry.lowercased_path)
            });
            if let Some(entry) = fallback {
                roles.fill_if_empty(Role::Diffuse, &entry.path);
            }
        }
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_model_material_and_diffuse() {
        let roles = classify(
            ["model.obj", "model.mtl", "textures/stone_basecolor.png"],
            None,
        );
        assert_eq!(roles.get(Role::Model), Some("model.obj"));
        assert_eq!(roles.get(Role::Material), Some("model.mtl"));
        assert_eq!(roles.get(Role::Diffuse), Some("textures/stone_basecolor.png"));
        assert_eq!(roles.get(Role::Normal), None);
    }

    #[test]
    fn empty_archive_leaves_every_role_unset() {
        let roles = classify(std::iter::empty(), Some("stone"));
        assert!(roles.is_empty());
    }

    #[test]
    fn first_candidate_wins_without_variant() {
        let roles = classify(["wood_albedo.png", "stone_albedo.png"], None);
        assert_eq!(roles.get(Role::Diffuse), Some("wood_albedo.png"));
    }

    #[test]
    fn desired_variant_takes_priority() {
        let roles = classify(
            ["wood_albedo.png", "stone_albedo.png", "wood_normal.png"],
            Some("Stone"),
        );
        assert_eq!(roles.get(Role::Diffuse), Some("stone_albedo.png"));
        // Backfilled from the generic sweep.
        assert_eq!(roles.get(Role::Normal), Some("wood_normal.png"));
    }

    #[test]
    fn skips_directories_and_macos_metadata() {
        let roles = classify(
            ["__MACOSX/._stone_color.png", "textures/", "stone_color.png"],
            None,
        );
        assert_eq!(roles.get(Role::Diffuse), Some("stone_color.png"));
    }

    #[test]
    fn one_entry_may_fill_several_roles() {
        let roles = classify(["metal_color.png"], None);
        assert_eq!(roles.get(Role::Diffuse), Some("metal_color.png"));
        assert_eq!(roles.get(Role::Metallic), Some("metal_color.png"));
    }

    #[test]
    fn non_image_files_are_not_textures() {
        let roles = classify(["color_notes.txt", "color.obj"], None);
        assert_eq!(roles.get(Role::Diffuse), None);
        assert_eq!(roles.get(Role::Model), Some("color.obj"));
    }

    #[test]
    fn variant_scan_accepts_other_image_formats() {
        let roles = classify(["stone_diffuse.tga", "wood_diffuse.tga"], Some("stone"));
        assert_eq!(roles.get(Role::Diffuse), Some("stone_diffuse.tga"));
    }

    #[test]
    fn textures_iterate_in_channel_order() {
        let roles = classify(["x_ao.png", "x_rough.png", "x_color.png"], None);
        let order: Vec<Role> = roles.textures().map(|(role, _)| role).collect();
        assert_eq!(order, vec![Role::Diffuse, Role::Roughness, Role::AmbientOcclusion]);
    }
}
