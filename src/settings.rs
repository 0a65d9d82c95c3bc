use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Which rendering of the split list the user last chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewState {
    Edit,
    Code,
}

/// Display order of the split list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortState {
    /// Chronological.
    Chron,
    /// Reverse chronological.
    RevChron,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewSettings {
    view_state: ViewState,
    sort_state: SortState,
    doc_view_state: ViewState,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            view_state: ViewState::Edit,
            sort_state: SortState::RevChron,
            doc_view_state: ViewState::Edit,
        }
    }
}

/// Persisted view preferences, written back on every update so the next
/// session starts where the last one left off.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ViewSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            ViewSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn view_state(&self) -> ViewState {
        self.data.read().unwrap().view_state
    }

    pub fn sort_state(&self) -> SortState {
        self.data.read().unwrap().sort_state
    }

    pub fn doc_view_state(&self) -> ViewState {
        self.data.read().unwrap().doc_view_state
    }

    pub fn update_view_state(&self, state: ViewState) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.view_state = state;
        self.persist(&guard)
    }

    pub fn update_sort_state(&self, state: SortState) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.sort_state = state;
        self.persist(&guard)
    }

    pub fn update_doc_view_state(&self, state: ViewState) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.doc_view_state = state;
        self.persist(&guard)
    }

    fn persist(&self, data: &ViewSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: ViewSettings = serde_json::from_str(&contents)?;
        let mut guard = self.data.write().unwrap();
        *guard = data;
        Ok(())
    }
}
