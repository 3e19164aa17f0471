//! Generated-object preview core: asks a generation service for a 3D model,
//! resolves the returned archive into model, material and texture roles,
//! builds a normalized scene object and swaps it into a single-object scene.

pub mod app;
pub mod assets;
pub mod backend;
pub mod config;
pub mod mapper;
pub mod scene;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use app::{AppError, PreviewChange, Session};
pub use backend::{GenerationBackend, HttpBackend};
pub use config::AppConfig;
