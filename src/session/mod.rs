//! Panel session state
//!
//! A [`PanelSession`] owns the live panel list and its [`LayoutConfig`]
//! together; every mutation touches both and returns the [`Patch`] a client
//! applies to stay in sync. Keys are `"<add counter>-<line index>"`.

pub mod batch;
pub mod store;

use chrono::{DateTime, Utc};
use panel_dsl::LayoutConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_PANELS;
use crate::registry::{PanelView, PanelWidth};
use crate::render::{PanelContent, PanelControls};

pub use batch::{BatchFailure, BatchOutcome, BatchPipeline};
pub use store::{create_session_store, SessionHandle, SessionStore};

/// One live panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRecord {
    pub key: String,
    /// Canonical spec line, as stored in the layout config
    pub spec_string: String,
    pub title: String,
    pub width: PanelWidth,
    pub content: PanelContent,
    pub controls: PanelControls,
}

impl PanelRecord {
    pub fn new(key: impl Into<String>, spec_string: impl Into<String>, view: PanelView) -> Self {
        Self {
            key: key.into(),
            spec_string: spec_string.into(),
            title: view.title,
            width: view.width,
            content: view.content,
            controls: view.controls,
        }
    }
}

/// Incremental edit of the client's panel list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    Append { record: PanelRecord },
    RemoveAt { position: usize },
    Replace { position: usize, record: PanelRecord },
}

/// Ops are applied in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub ops: Vec<PatchOp>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn extend(&mut self, other: Patch) {
        self.ops.extend(other.ops);
    }

    /// Replay onto a client-side copy of the panel list
    pub fn apply_to(&self, panels: &mut Vec<PanelRecord>) {
        for op in &self.ops {
            match op {
                PatchOp::Append { record } => panels.push(record.clone()),
                PatchOp::RemoveAt { position } => {
                    if *position < panels.len() {
                        panels.remove(*position);
                    }
                }
                PatchOp::Replace { position, record } => {
                    if let Some(slot) = panels.get_mut(*position) {
                        *slot = record.clone();
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PanelSession {
    pub id: Uuid,
    panels: Vec<PanelRecord>,
    layout: LayoutConfig,
    add_counter: u64,
    max_panels: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub panels: Vec<PanelRecord>,
    pub layout: LayoutConfig,
    pub add_counter: u64,
    pub max_panels: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PanelSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PANELS)
    }
}

impl PanelSession {
    pub fn new(max_panels: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            panels: Vec::new(),
            layout: LayoutConfig::new(),
            add_counter: 0,
            max_panels,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn panels(&self) -> &[PanelRecord] {
        &self.panels
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn add_counter(&self) -> u64 {
        self.add_counter
    }

    pub fn max_panels(&self) -> usize {
        self.max_panels
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.panels.len() >= self.max_panels
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.panels.iter().position(|p| p.key == key)
    }

    /// Start a batch; returns the counter used in its keys
    pub(crate) fn next_batch(&mut self) -> u64 {
        self.add_counter += 1;
        self.add_counter
    }

    pub(crate) fn append(&mut self, record: PanelRecord) -> PatchOp {
        self.layout.insert(record.key.clone(), record.spec_string.clone());
        self.panels.push(record.clone());
        self.touch();
        PatchOp::Append { record }
    }

    pub(crate) fn replace_at(&mut self, position: usize, record: PanelRecord) -> PatchOp {
        self.layout.insert(record.key.clone(), record.spec_string.clone());
        self.panels[position] = record.clone();
        self.touch();
        PatchOp::Replace { position, record }
    }

    /// Remove panels by key, highest position first; unknown keys are ignored
    pub fn delete<S: AsRef<str>>(&mut self, keys: &[S]) -> Patch {
        let mut positions: Vec<usize> = keys
            .iter()
            .filter_map(|key| self.position(key.as_ref()))
            .collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions.dedup();

        let ops: Vec<PatchOp> = positions
            .into_iter()
            .map(|position| {
                let record = self.panels.remove(position);
                self.layout.remove(&record.key);
                PatchOp::RemoveAt { position }
            })
            .collect();

        if !ops.is_empty() {
            tracing::debug!("Session {}: deleted {} panel(s)", self.id, ops.len());
            self.touch();
        }
        Patch { ops }
    }

    /// Delete the panels whose delete control shows a non-zero click count
    pub fn delete_clicked(&mut self, click_counts: &[u32]) -> Patch {
        let keys: Vec<String> = click_counts
            .iter()
            .zip(&self.panels)
            .filter(|(clicks, _)| **clicks > 0)
            .map(|(_, panel)| panel.key.clone())
            .collect();
        self.delete(&keys)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            panels: self.panels.clone(),
            layout: self.layout.clone(),
            add_counter: self.add_counter,
            max_panels: self.max_panels,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
