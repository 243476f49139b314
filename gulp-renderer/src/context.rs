//! Template contexts.

use serde::Serialize;

/// One entry of a merged labels document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelContext {
    pub full_name: String,
    pub language: String,
}

/// Everything the labels template needs: the labels of a single namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct LabelsContext {
    pub labels: Vec<LabelContext>,
}

impl LabelsContext {
    /// Build a context from label names, sorted so output is stable across
    /// runs regardless of query order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut labels: Vec<LabelContext> = names
            .iter()
            .map(|name| LabelContext {
                full_name: name.as_ref().to_string(),
                language: "en_US".to_string(),
            })
            .collect();
        labels.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Self { labels }
    }

    pub fn to_tera(&self) -> Result<tera::Context, crate::RenderError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}
