pub mod pipeline;

use std::path::Path;

use crate::assets::{
    classify, materialize, AssetError, EntrySource, ReleaseList, TransientStore, ZipArchiveSource,
};
use crate::backend::{BackendError, GenerationBackend, GenerationResponse, OptionSet};
use crate::config::AppConfig;
use crate::mapper::{map_description_with, ObjectParams};
use crate::scene::builder::BuildError;
use crate::scene::export::{export_object, export_to_file, ExportError};
use crate::scene::{
    BuildInput, BuildTicket, ColorParseError, CommitOutcome, ObjectSlot, ObjectSource, Rgb,
    SceneBuilder, SceneObject, ShapeKind, TeardownReport,
};
use crate::ui::UiState;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Color(#[from] ColorParseError),
    #[error("description is empty")]
    EmptyDescription,
    #[error("there is no object to export")]
    NoObject,
}

/// How a local preview request changed the scene.
#[derive(Debug, PartialEq, Eq)]
pub enum PreviewChange {
    /// A new primitive replaced the current object.
    Rebuilt { replaced: Option<TeardownReport> },
    /// Same shape and texture; only the color changed.
    Recolored,
    /// A generated object is showing. The selection is kept for the next
    /// request and the object stays as it is.
    Kept,
}

/// Owns the scene slot, the transient store and the selection state for one
/// user, and drives generation requests through the asset pipeline.
pub struct Session<B: GenerationBackend> {
    config: AppConfig,
    backend: B,
    builder: SceneBuilder,
    store: TransientStore,
    slot: ObjectSlot,
    ui: UiState,
    options: OptionSet,
    texture_pack: Option<Vec<u8>>,
    /// Texture family the local preview was last built with.
    preview_family: Option<String>,
}

impl<B: GenerationBackend> Session<B> {
    pub fn new(config: AppConfig, backend: B) -> Self {
        let builder = SceneBuilder::new(config.target_size);
        let ui = UiState::new(&config.default_params.color);
        let options = OptionSet::fallback(&config);
        Self {
            config,
            backend,
            builder,
            store: TransientStore::new(),
            slot: ObjectSlot::new(),
            ui,
            options,
            texture_pack: None,
            preview_family: None,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn slot(&self) -> &ObjectSlot {
        &self.slot
    }

    pub fn current(&self) -> Option<&SceneObject> {
        self.slot.current()
    }

    pub fn store(&self) -> &TransientStore {
        &self.store
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Fetches the option lists; a failed request leaves the fallback lists.
    pub fn load_options(&mut self) -> &OptionSet {
        let raw = match self.backend.options() {
            Ok(raw) => Some(raw),
            Err(err) => {
                log::warn!("Options unavailable, using fallback: {}", err);
                self.ui.set_status(format!("Options unavailable: {}", err));
                None
            }
        };
        self.options = OptionSet::with_fallback(raw, &self.config);
        self.ui.set_options(&self.options);
        &self.options
    }

    /// Archive of texture maps used to skin local previews. Validated on the
    /// way in.
    pub fn set_texture_pack(&mut self, bytes: Vec<u8>) -> Result<(), AppError> {
        let pack = ZipArchiveSource::from_bytes(bytes.clone())?;
        log::info!("Texture pack with {} entries", pack.entry_paths().len());
        self.texture_pack = Some(bytes);
        Ok(())
    }

    /// Shows `params` locally. Keeps the current primitive and only recolors
    /// it when shape and texture are unchanged. A server-generated object is
    /// never replaced by a preview.
    pub fn preview(&mut self, params: &ObjectParams) -> Result<PreviewChange, AppError> {
        let color = Rgb::from_hex(&params.color)?;
        let shape = ShapeKind::from_name(&params.shape);
        let family = params.texture.to_lowercase();

        if let Some(object) = self.slot.current_mut() {
            if object.source == ObjectSource::ServerParsed {
                object.set_color(color);
                return Ok(PreviewChange::Kept);
            }
        }

        let same_object = matches!(
            self.slot.current().map(|object| object.source),
            Some(ObjectSource::Local(current)) if current == shape
        ) && self.preview_family.as_deref() == Some(family.as_str());
        if same_object {
            if let Some(object) = self.slot.current_mut() {
                object.set_color(color);
            }
            return Ok(PreviewChange::Recolored);
        }

        let mut releases = ReleaseList::new();
        let mut input = BuildInput::local(shape, color).with_family(Some(family.as_str()));
        if let Some(bytes) = &self.texture_pack {
            match ZipArchiveSource::from_bytes(bytes.clone()) {
                Ok(mut pack) => {
                    let roles =
                        classify(pack.entry_paths().iter().map(String::as_str), Some(family.as_str()));
                    let set = materialize(&mut pack, &roles, &mut self.store, &mut releases);
                    input = input.with_textures(set.textures, set.channels);
                }
                Err(err) => log::warn!("Texture pack unreadable: {}", err),
            }
        }
        let object = self.builder.build(input, &mut self.store, releases)?;
        let replaced = self.slot.install(object, &mut self.store);
        self.preview_family = Some(family);
        Ok(PreviewChange::Rebuilt { replaced })
    }

    fn preview_selection(&mut self) -> Result<PreviewChange, AppError> {
        let params = self.ui.params(&self.config.default_params);
        self.preview(&params)
    }

    pub fn select_shape(&mut self, shape: &str) -> Result<PreviewChange, AppError> {
        self.ui.select_shape(shape);
        self.preview_selection()
    }

    pub fn select_texture(&mut self, texture: &str) -> Result<PreviewChange, AppError> {
        self.ui.select_texture(texture);
        self.preview_selection()
    }

    pub fn set_color(&mut self, color: &str) -> Result<PreviewChange, AppError> {
        Rgb::from_hex(color)?;
        self.ui.set_color(color);
        self.preview_selection()
    }

    pub fn begin_build(&mut self) -> BuildTicket {
        self.slot.begin_build()
    }

    /// Requests a model for the current selection and installs it.
    pub fn generate(&mut self) -> Result<CommitOutcome, AppError> {
        let params = self.ui.params(&self.config.default_params);
        log::info!(
            "Generating {} / {} / {}",
            params.shape,
            params.texture,
            params.color
        );
        let ticket = self.begin_build();
        let response = self.backend.generate(&params).map_err(|err| {
            self.ui.set_status(err.to_string());
            err
        })?;
        self.finish_build(ticket, &response, Some(params.texture.as_str()))
    }

    /// Maps the description onto the controls and asks the backend for the
    /// model. Once the request is accepted the mapped parameters are
    /// previewed locally until the download is built.
    pub fn generate_from_text(
        &mut self,
        description: &str,
    ) -> Result<(ObjectParams, CommitOutcome), AppError> {
        let text = description.trim();
        if text.is_empty() {
            return Err(AppError::EmptyDescription);
        }
        let params = map_description_with(text, &self.config.default_params);
        self.ui.set_description(text);
        self.ui.apply_params(&params);

        let ticket = self.begin_build();
        let response = self.backend.generate_from_text(text).map_err(|err| {
            self.ui.set_status(err.to_string());
            err
        })?;
        self.preview(&params)?;
        let outcome = self.finish_build(ticket, &response, Some(params.texture.as_str()))?;
        Ok((params, outcome))
    }

    /// Downloads, resolves and builds the object a response points at, then
    /// commits it under `ticket`. On error nothing in the scene changes.
    pub fn finish_build(
        &mut self,
        ticket: BuildTicket,
        response: &GenerationResponse,
        variant: Option<&str>,
    ) -> Result<CommitOutcome, AppError> {
        let mut source = pipeline::fetch_source(&self.backend, response)?;
        self.commit_source(ticket, source.as_mut(), variant)
    }

    /// Loads an archive already in memory, as if the backend had returned it.
    pub fn open_archive(
        &mut self,
        bytes: Vec<u8>,
        variant: Option<&str>,
    ) -> Result<CommitOutcome, AppError> {
        let ticket = self.begin_build();
        let mut source = ZipArchiveSource::from_bytes(bytes)?;
        self.commit_source(ticket, &mut source, variant)
    }

    fn commit_source(
        &mut self,
        ticket: BuildTicket,
        source: &mut dyn EntrySource,
        variant: Option<&str>,
    ) -> Result<CommitOutcome, AppError> {
        let mut releases = ReleaseList::new();
        let input = pipeline::assemble_archive(source, variant, &mut self.store, &mut releases);
        let object = self.builder.build(input, &mut self.store, releases)?;
        let outcome = self.slot.commit(ticket, object, &mut self.store);
        if let CommitOutcome::Installed { .. } = outcome {
            self.preview_family = None;
            if let Some(object) = self.slot.current() {
                self.ui.set_status(format!("Loaded '{}'", object.name));
            }
        }
        self.ui.update(&self.slot);
        Ok(outcome)
    }

    /// Clears selection, description and the current object.
    pub fn reset(&mut self) -> Option<TeardownReport> {
        self.ui.reset();
        self.preview_family = None;
        let report = self.slot.reset(&mut self.store);
        self.ui.update(&self.slot);
        report
    }

    pub fn export_current(&self) -> Result<Vec<u8>, AppError> {
        let object = self.slot.current().ok_or(AppError::NoObject)?;
        Ok(export_object(object, &self.store)?)
    }

    pub fn export_current_to(&self, path: &Path) -> Result<(), AppError> {
        let object = self.slot.current().ok_or(AppError::NoObject)?;
        export_to_file(object, &self.store, path)?;
        log::info!("Exported '{}' to {}", object.name, path.display());
        Ok(())
    }

    /// Advances the spin animation by `frames` frames.
    pub fn advance(&mut self, frames: u32) {
        for _ in 0..frames {
            self.slot.advance();
        }
    }

    pub fn summary(&mut self) -> &str {
        self.ui.update(&self.slot);
        self.ui.summary()
    }
}
