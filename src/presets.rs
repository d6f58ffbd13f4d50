//! Generation-parameter bundles and TOML preset loading.
//!
//! A preset is a flat TOML file mapping parameter names to values
//! (`temperature = 0.7`, `top_p = 0.9`, ...). The arena never interprets
//! these: they are forwarded verbatim to the reply generator, which merges
//! them into its backend request.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque key → value bundle passed through to the reply generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationParams(pub BTreeMap<String, serde_json::Value>);

impl GenerationParams {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Overlay `other` onto `self`. Keys present in `other` win.
    pub fn merge(&mut self, other: &GenerationParams) {
        for (key, value) in other.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Parse a flat TOML document into a parameter bundle.
    pub fn from_toml_str(text: &str) -> Result<Self, PresetError> {
        let map: BTreeMap<String, serde_json::Value> = toml::from_str(text)?;
        Ok(GenerationParams(map))
    }
}

/// Errors from preset discovery and loading.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("preset parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("preset '{0}' not found")]
    NotFound(String),
}

/// List the preset names (file stems of `*.toml` files) in `dir`, sorted.
pub fn available_presets(dir: &Path) -> Result<Vec<String>, PresetError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Load the named preset from `dir`.
pub fn load_preset(dir: &Path, name: &str) -> Result<GenerationParams, PresetError> {
    let path = dir.join(format!("{}.toml", name));
    if !path.is_file() {
        return Err(PresetError::NotFound(name.to_string()));
    }
    let text = fs::read_to_string(&path)?;
    GenerationParams::from_toml_str(&text)
}
