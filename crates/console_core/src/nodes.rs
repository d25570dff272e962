//! Node registry lookups: the per-node details dialog, the all-nodes preview
//! and the add/edit form.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{NodeId, NodeStatus},
    protocol::{NodeDraft, NodeSummary},
};
use tracing::{info, warn};

use crate::{api::ConsoleApi, error::ClientError};

pub const NODE_DETAILS_FAILED: &str = "Failed to load node details";
pub const NO_MODELS_AVAILABLE: &str = "No models available";
pub const NO_ACTIVE_NODES: &str = "No active nodes available";
const PREVIEW_MODEL_NAMES: usize = 3;

/// One-shot lookups against the registry. Each call stands alone: the
/// dialog it feeds is opened fresh per call, so no request gating applies.
pub struct NodeDetailFetcher {
    api: Arc<dyn ConsoleApi>,
}

impl NodeDetailFetcher {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self { api }
    }

    /// First node matching `node_id`; lookup failures are logged and
    /// reported as absent.
    pub async fn fetch(&self, node_id: NodeId) -> Option<NodeSummary> {
        match self.api.list_nodes(Some(node_id)).await {
            Ok(nodes) => nodes.into_iter().next(),
            Err(err) => {
                warn!(%node_id, error = %err, "node lookup failed");
                None
            }
        }
    }

    pub async fn open_details(&self, node_id: NodeId) -> NodeDetailsView {
        render_node_details(self.fetch(node_id).await.as_ref())
    }

    pub async fn fetch_all(&self) -> Vec<NodeSummary> {
        match self.api.list_nodes(None).await {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(error = %err, "node status listing failed");
                Vec::new()
            }
        }
    }

    pub async fn preview(&self) -> NodesPreviewView {
        render_nodes_preview(&self.fetch_all().await)
    }
}

pub fn format_latency(latency_seconds: Option<f64>) -> String {
    match latency_seconds {
        Some(seconds) => format!("{:.2} ms", seconds * 1000.0),
        None => "N/A".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Active,
    Standby,
}

impl From<&NodeStatus> for StatusTone {
    fn from(value: &NodeStatus) -> Self {
        match value {
            NodeStatus::Active => Self::Active,
            _ => Self::Standby,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelListView {
    Placeholder(String),
    Names(Vec<String>),
}

impl ModelListView {
    fn from_models(models: &[String], placeholder: &str) -> Self {
        if models.is_empty() {
            Self::Placeholder(placeholder.to_string())
        } else {
            Self::Names(models.to_vec())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDetailsPanel {
    pub rows: Vec<DetailRow>,
    pub status_tone: StatusTone,
    pub models_heading: String,
    pub models: ModelListView,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeDetailsView {
    Unavailable(String),
    Loaded(NodeDetailsPanel),
}

pub fn render_node_details(node: Option<&NodeSummary>) -> NodeDetailsView {
    let Some(node) = node else {
        return NodeDetailsView::Unavailable(NODE_DETAILS_FAILED.to_string());
    };

    NodeDetailsView::Loaded(NodeDetailsPanel {
        rows: vec![
            DetailRow {
                label: "ID",
                value: node.id.to_string(),
            },
            DetailRow {
                label: "Name",
                value: node.name.clone(),
            },
            DetailRow {
                label: "Address",
                value: node.address.clone(),
            },
            DetailRow {
                label: "Status",
                value: node.status.as_str().to_uppercase(),
            },
            DetailRow {
                label: "Active Requests",
                value: node.active_requests.to_string(),
            },
            DetailRow {
                label: "Latency",
                value: format_latency(node.latency),
            },
        ],
        status_tone: StatusTone::from(&node.status),
        models_heading: format!("Available Models ({})", node.models.len()),
        models: ModelListView::from_models(&node.models, NO_MODELS_AVAILABLE),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePreviewCard {
    pub name: String,
    pub status: String,
    pub status_tone: StatusTone,
    pub model_count: usize,
    pub models_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodesPreviewView {
    Empty(String),
    Cards(Vec<NodePreviewCard>),
}

fn summarize_models(models: &[String]) -> String {
    if models.is_empty() {
        return "No models".to_string();
    }
    let mut summary = models
        .iter()
        .take(PREVIEW_MODEL_NAMES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if models.len() > PREVIEW_MODEL_NAMES {
        summary.push_str("...");
    }
    summary
}

pub fn render_nodes_preview(nodes: &[NodeSummary]) -> NodesPreviewView {
    if nodes.is_empty() {
        return NodesPreviewView::Empty(NO_ACTIVE_NODES.to_string());
    }
    NodesPreviewView::Cards(
        nodes
            .iter()
            .map(|node| NodePreviewCard {
                name: node.name.clone(),
                status: node.status.as_str().to_string(),
                status_tone: StatusTone::from(&node.status),
                model_count: node.models.len(),
                models_summary: summarize_models(&node.models),
            })
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Add,
    Edit(NodeId),
}

/// Values used to prefill the form when editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSeed {
    pub id: NodeId,
    pub name: String,
    pub address: String,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEditorState {
    pub open: bool,
    pub mode: EditorMode,
    pub name: String,
    pub address: String,
    pub port_input: String,
    pub active: bool,
    pub saving: bool,
    pub error: Option<String>,
}

impl Default for NodeEditorState {
    fn default() -> Self {
        Self {
            open: false,
            mode: EditorMode::Add,
            name: String::new(),
            address: String::new(),
            port_input: String::new(),
            active: true,
            saving: false,
            error: None,
        }
    }
}

impl NodeEditorState {
    pub fn title(&self) -> &'static str {
        match self.mode {
            EditorMode::Add => "Add Node",
            EditorMode::Edit(_) => "Edit Node",
        }
    }

    fn draft(&self) -> Result<NodeDraft, ClientError> {
        let name = self.name.trim();
        let address = self.address.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("Node name is required".into()));
        }
        if address.is_empty() {
            return Err(ClientError::Validation("Node address is required".into()));
        }
        let port = self
            .port_input
            .trim()
            .parse::<u16>()
            .map_err(|_| ClientError::Validation("Port must be a number between 0 and 65535".into()))?;
        Ok(NodeDraft {
            name: name.to_string(),
            address: address.to_string(),
            port,
            active: self.active,
        })
    }
}

/// Add/edit form. Saving writes through to the registry and then reloads
/// the full node list; nothing is patched locally.
pub struct NodeEditor {
    api: Arc<dyn ConsoleApi>,
    state: Mutex<NodeEditorState>,
}

impl NodeEditor {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            state: Mutex::new(NodeEditorState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, NodeEditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> NodeEditorState {
        self.lock_state().clone()
    }

    pub fn open_add(&self) {
        *self.lock_state() = NodeEditorState {
            open: true,
            ..NodeEditorState::default()
        };
    }

    pub fn open_edit(&self, seed: NodeSeed) {
        *self.lock_state() = NodeEditorState {
            open: true,
            mode: EditorMode::Edit(seed.id),
            name: seed.name,
            address: seed.address,
            port_input: seed.port.map(|p| p.to_string()).unwrap_or_default(),
            ..NodeEditorState::default()
        };
    }

    pub fn close(&self) {
        let mut state = self.lock_state();
        state.open = false;
        state.error = None;
    }

    pub fn set_name(&self, value: impl Into<String>) {
        self.lock_state().name = value.into();
    }

    pub fn set_address(&self, value: impl Into<String>) {
        self.lock_state().address = value.into();
    }

    pub fn set_port(&self, value: impl Into<String>) {
        self.lock_state().port_input = value.into();
    }

    pub fn set_active(&self, active: bool) {
        self.lock_state().active = active;
    }

    /// Writes the form to the registry and returns the refreshed node list.
    pub async fn save(&self) -> Result<Vec<NodeSummary>, ClientError> {
        let (node_id, draft) = {
            let mut state = self.lock_state();
            if state.saving {
                return Err(ClientError::Validation("A save is already in progress".into()));
            }
            let draft = match state.draft() {
                Ok(draft) => draft,
                Err(err) => {
                    state.error = Some(err.to_string());
                    return Err(err);
                }
            };
            state.saving = true;
            state.error = None;
            let node_id = match state.mode {
                EditorMode::Add => None,
                EditorMode::Edit(id) => Some(id),
            };
            (node_id, draft)
        };

        let mut in_flight = SaveInFlight {
            editor: self,
            armed: true,
        };
        let saved = self.api.save_node(node_id, &draft).await;
        in_flight.armed = false;
        {
            let mut state = self.lock_state();
            state.saving = false;
            match &saved {
                Ok(_) => state.open = false,
                Err(err) => state.error = Some(err.to_string()),
            }
        }

        let record = saved.inspect_err(|err| warn!(error = %err, "node save failed"))?;
        info!(node_id = %record.id, name = %record.name, "node saved");
        self.api.list_nodes(None).await
    }
}

struct SaveInFlight<'a> {
    editor: &'a NodeEditor,
    armed: bool,
}

impl Drop for SaveInFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.editor.lock_state().saving = false;
        }
    }
}

#[cfg(test)]
#[path = "tests/nodes_tests.rs"]
mod tests;
