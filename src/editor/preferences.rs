use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Bounds;
use crate::error::{ChartError, ChartResult};

pub const PREVIEW_MODE_KEY: &str = "editorPreviewMode";

/// Size of the chart preview in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    Mobile,
    #[default]
    Desktop,
}

impl PreviewMode {
    #[must_use]
    pub const fn bounds(self) -> Bounds {
        match self {
            Self::Mobile => Bounds::new(0.0, 0.0, 360.0, 500.0),
            Self::Desktop => Bounds::new(0.0, 0.0, 800.0, 600.0),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }

    /// Stored mode, or the default when missing or unreadable.
    #[must_use]
    pub fn load(store: &dyn PreferenceStore) -> Self {
        match store.get(PREVIEW_MODE_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|err: ChartError| {
                debug!(error = %err, "ignoring stored preview mode");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(err) => {
                debug!(error = %err, "preference store unavailable; using default preview mode");
                Self::default()
            }
        }
    }
}

impl fmt::Display for PreviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreviewMode {
    type Err = ChartError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "mobile" => Ok(Self::Mobile),
            "desktop" => Ok(Self::Desktop),
            other => Err(ChartError::Preference(format!(
                "unknown preview mode `{other}`"
            ))),
        }
    }
}

/// Durable string preferences.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> ChartResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ChartResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: RefCell<IndexMap<String, String>>,
}

impl MemoryPreferenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> ChartResult<Option<String>> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ChartResult<()> {
        self.values
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Preferences kept as a flat JSON object in one file.
///
/// The file is read on every `get` and rewritten on every `set`; a missing
/// file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
}

impl JsonFilePreferenceStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> ChartResult<IndexMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(IndexMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| ChartError::decode("preferences", err)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(IndexMap::new()),
            Err(err) => Err(ChartError::Preference(format!(
                "failed to read {}: {err}",
                self.path.display()
            ))),
        }
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> ChartResult<Option<String>> {
        Ok(self.load()?.shift_remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ChartResult<()> {
        let mut values = self.load()?;
        values.insert(key.to_owned(), value.to_owned());
        let raw = serde_json::to_string_pretty(&values)
            .map_err(|err| ChartError::Preference(err.to_string()))?;
        fs::write(&self.path, raw).map_err(|err| {
            ChartError::Preference(format!("failed to write {}: {err}", self.path.display()))
        })?;
        debug!(key, value, path = %self.path.display(), "preference saved");
        Ok(())
    }
}
