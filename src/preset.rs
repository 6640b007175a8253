//! Preset files and their two accepted shapes.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::config::{CatalogConfig, SourceConfig};

/// Which source group a preset was listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    Main,
    Character,
}

impl PresetKind {
    pub fn as_str(&self) -> &str {
        match self {
            PresetKind::Main => "main",
            PresetKind::Character => "character",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    #[serde(default, rename = "type")]
    pub message_type: Option<String>,
    pub content: String,
}

/// A full conversation preset: trigger keywords plus a message list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MainPreset {
    pub keywords: Vec<String>,
    pub prompts: Vec<PromptMessage>,
    #[serde(default)]
    pub format_user_prompt: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A group-chat character preset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CharacterPreset {
    pub name: String,
    pub nick_name: Vec<String>,
    pub input: String,
    pub system: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub mute_keyword: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresetShape {
    Main(MainPreset),
    Character(CharacterPreset),
}

impl PresetShape {
    /// Decide the shape from which keys are present, then deserialize it.
    pub fn parse(text: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(text).context("Invalid YAML")?;
        let Some(map) = value.as_mapping() else {
            bail!("Preset is not a YAML mapping");
        };
        let has = |key: &str| map.contains_key(key);

        if has("keywords") && has("prompts") {
            let preset = serde_yaml::from_value(value).context("Malformed main preset")?;
            Ok(PresetShape::Main(preset))
        } else if has("name") && has("nick_name") && has("input") && has("system") {
            let preset = serde_yaml::from_value(value).context("Malformed character preset")?;
            Ok(PresetShape::Character(preset))
        } else {
            bail!("Preset has neither keywords/prompts nor name/nick_name/input/system")
        }
    }

    /// Keywords shown in the catalog.
    pub fn keywords(&self) -> Vec<String> {
        match self {
            PresetShape::Main(preset) => preset.keywords.clone(),
            PresetShape::Character(preset) => vec![preset.name.clone()],
        }
    }
}

/// One preset file, addressed by its raw-content URL.
#[derive(Debug, Clone)]
pub struct PresetDocument {
    /// File name without extension
    pub name: String,
    pub kind: PresetKind,
    /// Canonical identifier, also the cache key
    pub raw_path: String,
    pub relative_path: String,
    pub raw_text: String,
    pub shape: PresetShape,
}

impl PresetDocument {
    pub fn from_text(
        file_name: &str,
        source: &SourceConfig,
        catalog: &CatalogConfig,
        raw_text: String,
    ) -> Result<Self> {
        let shape = PresetShape::parse(&raw_text)
            .with_context(|| format!("Failed to parse preset {}/{}", source.dir, file_name))?;
        let name = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
            .to_string();
        let relative_path = format!("{}/{}/{}", catalog.branch, source.dir, file_name);
        let raw_path = format!(
            "{}/{}",
            catalog.remote_base_url.trim_end_matches('/'),
            relative_path
        );

        Ok(Self {
            name,
            kind: source.kind,
            raw_path,
            relative_path,
            raw_text,
            shape,
        })
    }
}

fn is_preset_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Read every preset in one source directory, sorted by file name.
/// A missing directory or an unparseable preset fails the whole load.
pub async fn load_source(
    root: &Path,
    source: &SourceConfig,
    catalog: &CatalogConfig,
) -> Result<Vec<PresetDocument>> {
    let dir = root.join(&source.dir);
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .with_context(|| format!("Failed to list preset directory {}", dir.display()))?;

    let mut file_names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !is_preset_file(&path) {
            debug!("Skipping non-preset entry {}", path.display());
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            file_names.push(name.to_string());
        }
    }
    file_names.sort();

    let mut documents = Vec::with_capacity(file_names.len());
    for file_name in file_names {
        let path = dir.join(&file_name);
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        documents.push(PresetDocument::from_text(&file_name, source, catalog, text)?);
    }

    info!(
        "Loaded {} {} presets from {}",
        documents.len(),
        source.kind.as_str(),
        source.dir
    );
    Ok(documents)
}

/// Load all configured sources concurrently, returning groups in source order.
pub async fn load_all(root: &Path, catalog: &CatalogConfig) -> Result<Vec<Vec<PresetDocument>>> {
    let mut tasks = tokio::task::JoinSet::new();
    for (index, source) in catalog.sources.iter().enumerate() {
        let root = root.to_path_buf();
        let source = source.clone();
        let catalog = catalog.clone();
        tasks.spawn(async move { (index, load_source(&root, &source, &catalog).await) });
    }

    let mut groups: Vec<Option<Vec<PresetDocument>>> = vec![None; catalog.sources.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined.context("Preset loading task panicked")?;
        groups[index] = Some(result?);
    }

    Ok(groups.into_iter().flatten().collect())
}
