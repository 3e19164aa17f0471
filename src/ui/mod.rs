use crate::backend::OptionSet;
use crate::mapper::ObjectParams;
use crate::scene::{ObjectSlot, SlotState};

/// One dropdown row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub value: String,
    pub label: String,
}

impl OptionEntry {
    fn plain(value: &str) -> Self {
        Self {
            value: value.to_string(),
            label: value.to_string(),
        }
    }

    fn capitalized(value: &str) -> Self {
        let mut chars = value.chars();
        let label = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Self {
            value: value.to_string(),
            label,
        }
    }
}

/// Selection and display state behind the controls.
pub struct UiState {
    shape_entries: Vec<OptionEntry>,
    texture_entries: Vec<OptionEntry>,
    color_entries: Vec<OptionEntry>,
    selected_shape: Option<String>,
    selected_texture: Option<String>,
    color: String,
    description: String,
    status: String,
    summary: String,
}

impl UiState {
    pub fn new(default_color: &str) -> Self {
        Self {
            shape_entries: Vec::new(),
            texture_entries: Vec::new(),
            color_entries: Vec::new(),
            selected_shape: None,
            selected_texture: None,
            color: default_color.to_string(),
            description: String::new(),
            status: String::new(),
            summary: String::new(),
        }
    }

    pub fn set_options(&mut self, options: &OptionSet) {
        self.shape_entries = options.shapes.iter().map(|s| OptionEntry::plain(s)).collect();
        self.texture_entries = options
            .textures
            .iter()
            .map(|t| OptionEntry::capitalized(t))
            .collect();
        self.color_entries = options.colors.iter().map(|c| OptionEntry::plain(c)).collect();
    }

    pub fn shape_entries(&self) -> &[OptionEntry] {
        &self.shape_entries
    }

    pub fn texture_entries(&self) -> &[OptionEntry] {
        &self.texture_entries
    }

    pub fn color_entries(&self) -> &[OptionEntry] {
        &self.color_entries
    }

    pub fn select_shape(&mut self, shape: &str) {
        self.selected_shape = Some(shape.to_string());
    }

    pub fn select_texture(&mut self, texture: &str) {
        self.selected_texture = Some(texture.to_string());
    }

    pub fn set_color(&mut self, color: &str) {
        self.color = color.to_string();
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    /// Mirrors mapped parameters into the controls.
    pub fn apply_params(&mut self, params: &ObjectParams) {
        self.select_shape(&params.shape);
        self.select_texture(&params.texture);
        self.set_color(&params.color);
    }

    pub fn selected_shape(&self) -> Option<&str> {
        self.selected_shape.as_deref()
    }

    pub fn selected_texture(&self) -> Option<&str> {
        self.selected_texture.as_deref()
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current selection with unset fields taken from `defaults`.
    pub fn params(&self, defaults: &ObjectParams) -> ObjectParams {
        ObjectParams {
            shape: self
                .selected_shape
                .clone()
                .unwrap_or_else(|| defaults.shape.clone()),
            color: self.color.clone(),
            texture: self
                .selected_texture
                .clone()
                .unwrap_or_else(|| defaults.texture.clone()),
        }
    }

    pub fn shape_button_label(&self) -> &str {
        self.selected_shape.as_deref().unwrap_or("Select Shape")
    }

    pub fn texture_button_label(&self) -> String {
        match &self.selected_texture {
            Some(texture) => OptionEntry::capitalized(texture).label,
            None => "Select Texture".to_string(),
        }
    }

    pub fn reset(&mut self) {
        self.selected_shape = None;
        self.selected_texture = None;
        self.description.clear();
        self.status.clear();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn update(&mut self, slot: &ObjectSlot) {
        let mut summary = match (slot.state(), slot.current()) {
            (SlotState::Populated, Some(object)) => {
                let transform = object.transform;
                format!(
                    "{} [{:?}] vertices {}, materials {}, scale {:.3}, position {:.2}, {:.2}, {:.2}",
                    object.name,
                    object.source,
                    object.vertex_count(),
                    object.materials.len(),
                    transform.uniform_scale,
                    transform.position.x,
                    transform.position.y,
                    transform.position.z
                )
            }
            _ => "No object".to_string(),
        };
        if !self.status.is_empty() {
            summary.push('\n');
            summary.push_str(&self.status);
        }
        self.summary = summary;
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}
