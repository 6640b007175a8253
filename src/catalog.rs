//! The published `presets.json` index.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::annotation::Annotation;
use crate::preset::{PresetDocument, PresetKind};
use crate::util::write_json_pretty;

/// One catalog entry. Annotation fields are omitted when none is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetRecord {
    pub keywords: Vec<String>,
    #[serde(rename = "type")]
    pub kind: PresetKind,
    pub name: String,
    pub raw_path: String,
    pub relative_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl PresetRecord {
    pub fn new(doc: &PresetDocument, annotation: Option<Annotation>) -> Self {
        let (description, rating, tags) = match annotation {
            Some(a) => (Some(a.description), Some(a.rating), Some(a.tags)),
            None => (None, None, None),
        };
        Self {
            keywords: doc.shape.keywords(),
            kind: doc.kind,
            name: doc.name.clone(),
            raw_path: doc.raw_path.clone(),
            relative_path: doc.relative_path.clone(),
            description,
            rating,
            tags,
        }
    }

    pub fn is_annotated(&self) -> bool {
        self.description.is_some()
    }
}

pub fn write_catalog(path: &Path, records: &[PresetRecord]) -> Result<()> {
    write_json_pretty(path, records)?;
    let annotated = records.iter().filter(|r| r.is_annotated()).count();
    info!(
        "Wrote {} presets ({} annotated) to {}",
        records.len(),
        annotated,
        path.display()
    );
    Ok(())
}
