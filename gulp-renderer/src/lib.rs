//! # gulp-renderer
//!
//! Mirror path derivation and rendered documents for gulped metadata.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gulp_renderer::{ArtifactKind, Renderer};
//!
//! fn labels_file(names: &[String]) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(content) = renderer.render_labels(names) {
//!             let path = ArtifactKind::Labels.path("unmanaged", "");
//!             println!("{}: {} bytes", path.display(), content.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{LabelContext, LabelsContext};
pub use engine::{field_path, ArtifactKind, Renderer};
pub use error::RenderError;
