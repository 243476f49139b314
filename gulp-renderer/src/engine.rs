//! Path derivation ([`ArtifactKind`]) and the Tera [`Renderer`].
//!
//! # Mirror layout
//!
//! | Kind      | Path under `<namespace-or-unmanaged>/`                     |
//! |-----------|------------------------------------------------------------|
//! | Class     | `classes/<Name>.cls`                                       |
//! | Page      | `pages/<Name>.page`                                        |
//! | Component | `components/<Name>.component`                              |
//! | Flow      | `flows/<DeveloperName>.flow`                               |
//! | Labels    | `CustomLabels.labels-meta.xml` (one per namespace)         |
//! | Object    | `objects/<Object>.object`                                  |
//! | Field     | `objects/<Object>/fields/<Field>.field-meta.xml`           |

use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::LabelsContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates, baked in at compile time via include_str!
// ---------------------------------------------------------------------------

const LABELS_TEMPLATE: &str = "labels/custom_labels.xml";

const TPLS: &[(&str, &str)] = &[(
    LABELS_TEMPLATE,
    include_str!("templates/custom_labels.xml.tera"),
)];

fn build_tera() -> Result<Tera, RenderError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TPLS.iter().copied())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// ArtifactKind
// ---------------------------------------------------------------------------

/// Every artifact kind written to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Class,
    Page,
    Component,
    Flow,
    Labels,
    Object,
    Field,
}

impl ArtifactKind {
    /// All kinds in a stable order.
    pub fn all() -> &'static [ArtifactKind] {
        &[
            ArtifactKind::Class,
            ArtifactKind::Page,
            ArtifactKind::Component,
            ArtifactKind::Flow,
            ArtifactKind::Labels,
            ArtifactKind::Object,
            ArtifactKind::Field,
        ]
    }

    /// Second-level folder, if the kind has one.
    pub fn folder(&self) -> Option<&'static str> {
        match self {
            ArtifactKind::Class     => Some("classes"),
            ArtifactKind::Page      => Some("pages"),
            ArtifactKind::Component => Some("components"),
            ArtifactKind::Flow      => Some("flows"),
            ArtifactKind::Labels    => None,
            ArtifactKind::Object    => Some("objects"),
            ArtifactKind::Field     => Some("fields"),
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Class     => ".cls",
            ArtifactKind::Page      => ".page",
            ArtifactKind::Component => ".component",
            ArtifactKind::Flow      => ".flow",
            ArtifactKind::Labels    => ".labels-meta.xml",
            ArtifactKind::Object    => ".object",
            ArtifactKind::Field     => ".field-meta.xml",
        }
    }

    /// Mirror-relative path of artifact `name` owned by `directory`.
    ///
    /// `Labels` ignores `name`: a namespace has exactly one labels file.
    /// Use [`field_path`] for fields, which also need their object.
    pub fn path(&self, directory: &str, name: &str) -> PathBuf {
        let root = Path::new(directory);
        match (self, self.folder()) {
            (ArtifactKind::Labels, _) => root.join(format!("CustomLabels{}", self.extension())),
            (_, Some(folder)) => root.join(folder).join(format!("{name}{}", self.extension())),
            (_, None) => root.join(format!("{name}{}", self.extension())),
        }
    }
}

/// `<directory>/objects/<object>/fields/<field>.field-meta.xml`
pub fn field_path(directory: &str, object: &str, field: &str) -> PathBuf {
    Path::new(directory)
        .join("objects")
        .join(object)
        .join("fields")
        .join(format!("{field}{}", ArtifactKind::Field.extension()))
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders the documents gulp synthesises rather than copies verbatim.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        Ok(Self { tera: build_tera()? })
    }

    /// One merged labels document holding every name in `names`.
    pub fn render_labels<S: AsRef<str>>(&self, names: &[S]) -> Result<String, RenderError> {
        let ctx = LabelsContext::from_names(names).to_tera()?;
        Ok(self.tera.render(LABELS_TEMPLATE, &ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
