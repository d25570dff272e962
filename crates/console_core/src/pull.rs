//! Model pull submission: one node through [`PullSubmitter`], every node
//! through [`BroadcastPullOrchestrator`].
//!
//! Both keep their submit control disabled while a request is outstanding,
//! which is the only in-flight guard they need: each owns at most one request
//! at a time and shares nothing with other controllers.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::{
    domain::NodeId,
    protocol::{NodeSummary, PullRequest, PullResult},
};
use tracing::{debug, info, warn};

use crate::{
    api::ConsoleApi,
    error::ClientError,
    view::{ResultLine, StatusBanner},
};

pub const EMPTY_MODEL_MESSAGE: &str = "Please enter a model name";
pub const PULL_FAILED_MESSAGE: &str = "Failed to pull model";
pub const PULL_PROGRESS_MESSAGE: &str = "Pulling model... This may take a few minutes.";
pub const BROADCAST_PROGRESS_MESSAGE: &str =
    "Pulling model to all nodes... This may take several minutes.";
pub const NO_NODES_PULLED_MESSAGE: &str = "No active nodes available";
pub const NODE_INFO_FAILED: &str = "Failed to load node information";
pub const NO_MODELS_INSTALLED: &str = "No models installed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle<T> {
    Idle,
    Pending,
    Settled(T),
}

impl<T> Lifecycle<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Input rejected before anything was sent.
    Invalid(String),
    Succeeded(String),
    Failed(String),
}

impl PullOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

fn transport_message(err: &ClientError) -> String {
    match err {
        ClientError::Rejected { message, .. } => message
            .clone()
            .unwrap_or_else(|| PULL_FAILED_MESSAGE.to_string()),
        other => format!("Error: {other}"),
    }
}

fn single_outcome(result: Result<Vec<PullResult>, ClientError>) -> PullOutcome {
    match result {
        Ok(results) => match results.into_iter().next() {
            Some(result) if result.succeeded() => PullOutcome::Succeeded(result.message),
            Some(result) => PullOutcome::Failed(result.message),
            None => PullOutcome::Failed(PULL_FAILED_MESSAGE.to_string()),
        },
        Err(err) => PullOutcome::Failed(transport_message(&err)),
    }
}

fn settled_banner(outcome: &PullOutcome) -> StatusBanner {
    match outcome {
        PullOutcome::Invalid(message) => StatusBanner::error(message.clone()),
        PullOutcome::Succeeded(message) => StatusBanner::success(format!("✓ {message}")),
        PullOutcome::Failed(message) => StatusBanner::error(format!("✗ {message}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullTarget {
    pub node_id: NodeId,
    pub node_name: String,
}

/// Models already on the target, shown above the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInfoView {
    Loading,
    Unavailable(String),
    Loaded {
        heading: String,
        models: Vec<String>,
        placeholder: Option<String>,
    },
}

pub fn render_pull_node_info(node: Option<&NodeSummary>) -> NodeInfoView {
    let Some(node) = node else {
        return NodeInfoView::Unavailable(NODE_INFO_FAILED.to_string());
    };
    NodeInfoView::Loaded {
        heading: format!("Current Models on {} ({})", node.name, node.models.len()),
        models: node.models.clone(),
        placeholder: node
            .models
            .is_empty()
            .then(|| NO_MODELS_INSTALLED.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullDialogState {
    pub open: bool,
    /// Bumped on every open and close; late results and timers from an
    /// earlier session are ignored.
    pub session: u64,
    pub target: Option<PullTarget>,
    pub model_input: String,
    pub submit_enabled: bool,
    pub lifecycle: Lifecycle<PullOutcome>,
    pub node_info: NodeInfoView,
}

impl Default for PullDialogState {
    fn default() -> Self {
        Self {
            open: false,
            session: 0,
            target: None,
            model_input: String::new(),
            submit_enabled: true,
            lifecycle: Lifecycle::Idle,
            node_info: NodeInfoView::Loading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullDialogView {
    pub open: bool,
    pub title: String,
    pub model_input: String,
    pub submit_enabled: bool,
    pub status: Option<StatusBanner>,
    pub node_info: NodeInfoView,
}

pub fn render_pull_dialog(state: &PullDialogState) -> PullDialogView {
    let status = match &state.lifecycle {
        Lifecycle::Idle => None,
        Lifecycle::Pending => Some(StatusBanner::loading(PULL_PROGRESS_MESSAGE)),
        Lifecycle::Settled(outcome) => Some(settled_banner(outcome)),
    };
    PullDialogView {
        open: state.open,
        title: state
            .target
            .as_ref()
            .map(|target| format!("Pull Model to {}", target.node_name))
            .unwrap_or_default(),
        model_input: state.model_input.clone(),
        submit_enabled: state.submit_enabled,
        status,
        node_info: state.node_info.clone(),
    }
}

/// Pulls a model to a single node from a dialog.
///
/// Success is terminal for the dialog session: the submit control stays
/// disabled and the dialog closes itself after `auto_close_delay`. Errors
/// re-enable submit so the user can retry. Reopening starts a fresh session.
pub struct PullSubmitter {
    api: Arc<dyn ConsoleApi>,
    auto_close_delay: Duration,
    state: Mutex<PullDialogState>,
}

impl PullSubmitter {
    pub fn new(api: Arc<dyn ConsoleApi>, auto_close_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            api,
            auto_close_delay,
            state: Mutex::new(PullDialogState::default()),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, PullDialogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> PullDialogState {
        self.lock_state().clone()
    }

    pub fn view(&self) -> PullDialogView {
        render_pull_dialog(&self.lock_state())
    }

    /// Resets to Idle for `node_id` and loads the node's current models.
    pub async fn open(&self, node_id: NodeId, node_name: impl Into<String>) {
        self.open_target(node_id, Some(node_name.into())).await;
    }

    /// Like [`open`](Self::open) for a node known only by id. The title uses
    /// the name from the same lookup that loads the models.
    pub async fn open_node(&self, node_id: NodeId) {
        self.open_target(node_id, None).await;
    }

    async fn open_target(&self, node_id: NodeId, node_name: Option<String>) {
        let named = node_name.is_some();
        let session = {
            let mut state = self.lock_state();
            let session = state.session + 1;
            *state = PullDialogState {
                open: true,
                session,
                target: Some(PullTarget {
                    node_id,
                    node_name: node_name.unwrap_or_else(|| format!("node {node_id}")),
                }),
                ..PullDialogState::default()
            };
            session
        };

        let node = match self.api.list_nodes(Some(node_id)).await {
            Ok(nodes) => nodes.into_iter().next(),
            Err(err) => {
                warn!(%node_id, error = %err, "pull target lookup failed");
                None
            }
        };

        let mut state = self.lock_state();
        if state.session != session {
            return;
        }
        state.node_info = render_pull_node_info(node.as_ref());
        let fetched_name = node.map(|node| node.name).filter(|name| !name.is_empty());
        if let (false, Some(name), Some(target)) = (named, fetched_name, state.target.as_mut()) {
            target.node_name = name;
        }
    }

    pub fn close(&self) {
        let mut state = self.lock_state();
        state.open = false;
        state.target = None;
        state.session += 1;
    }

    fn close_session(&self, session: u64) {
        let mut state = self.lock_state();
        if state.session == session && state.open {
            debug!(session, "closing pull dialog after success");
            state.open = false;
            state.target = None;
            state.session += 1;
        }
    }

    pub fn set_model_input(&self, value: impl Into<String>) {
        self.lock_state().model_input = value.into();
    }

    /// Enter submits, but only while the submit control is enabled.
    pub async fn key_pressed(self: &Arc<Self>, key: &str) -> Option<PullOutcome> {
        if key != "Enter" || !self.lock_state().submit_enabled {
            return None;
        }
        self.submit().await
    }

    /// `None` when submit is currently disabled or no dialog is open; nothing
    /// is sent in that case.
    pub async fn submit(self: &Arc<Self>) -> Option<PullOutcome> {
        let (request, session) = {
            let mut state = self.lock_state();
            if !state.open || !state.submit_enabled {
                return None;
            }
            let target = state.target.clone()?;
            let model = state.model_input.trim().to_string();
            if model.is_empty() {
                let outcome = PullOutcome::Invalid(EMPTY_MODEL_MESSAGE.to_string());
                state.lifecycle = Lifecycle::Settled(outcome.clone());
                return Some(outcome);
            }
            state.submit_enabled = false;
            state.lifecycle = Lifecycle::Pending;
            (
                PullRequest {
                    model,
                    node_id: Some(target.node_id),
                },
                state.session,
            )
        };

        let mut in_flight = SubmitInFlight {
            submitter: &**self,
            session,
            armed: true,
        };
        let result = self.api.pull_model(&request).await;
        in_flight.armed = false;
        let outcome = single_outcome(result);
        info!(model = %request.model, node_id = ?request.node_id, success = outcome.is_success(), "pull settled");

        let current = {
            let mut state = self.lock_state();
            let current = state.session == session;
            if current {
                state.lifecycle = Lifecycle::Settled(outcome.clone());
                state.submit_enabled = !outcome.is_success();
            }
            current
        };

        if current && outcome.is_success() {
            let submitter = Arc::clone(self);
            let delay = self.auto_close_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                submitter.close_session(session);
            });
        }
        Some(outcome)
    }
}

/// Puts the dialog back to a retryable Idle if the submit future is dropped
/// while the request is outstanding.
struct SubmitInFlight<'a> {
    submitter: &'a PullSubmitter,
    session: u64,
    armed: bool,
}

impl Drop for SubmitInFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.submitter.lock_state();
        if state.session == self.session && state.lifecycle.is_pending() {
            state.lifecycle = Lifecycle::Idle;
            state.submit_enabled = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

/// Per-node results of a broadcast, in the order the service returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSummary {
    pub results: Vec<PullResult>,
    pub succeeded: usize,
    pub total: usize,
}

impl PullSummary {
    pub fn from_results(results: Vec<PullResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.succeeded()).count();
        let total = results.len();
        Self {
            results,
            succeeded,
            total,
        }
    }

    pub fn status(&self) -> AggregateStatus {
        if self.succeeded == self.total {
            AggregateStatus::AllSucceeded
        } else if self.succeeded == 0 {
            AggregateStatus::AllFailed
        } else {
            AggregateStatus::Partial
        }
    }

    pub fn lines(&self) -> Vec<ResultLine> {
        self.results
            .iter()
            .map(|result| ResultLine {
                target: result.node_name.clone(),
                succeeded: result.succeeded(),
                message: result.message.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Invalid(String),
    Completed(PullSummary),
    /// No per-node results at all.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastState {
    pub model_input: String,
    pub submit_enabled: bool,
    pub lifecycle: Lifecycle<BroadcastOutcome>,
}

impl Default for BroadcastState {
    fn default() -> Self {
        Self {
            model_input: String::new(),
            submit_enabled: true,
            lifecycle: Lifecycle::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastView {
    pub model_input: String,
    pub submit_enabled: bool,
    pub status: Option<StatusBanner>,
}

pub fn broadcast_banner(outcome: &BroadcastOutcome) -> StatusBanner {
    match outcome {
        BroadcastOutcome::Invalid(message) => StatusBanner::error(message.clone()),
        BroadcastOutcome::Failed(message) => StatusBanner::error(format!("✗ {message}")),
        BroadcastOutcome::Completed(summary) => {
            let banner = match summary.status() {
                AggregateStatus::AllSucceeded => StatusBanner::success(format!(
                    "✓ Successfully pulled to all {} nodes",
                    summary.total
                )),
                AggregateStatus::Partial | AggregateStatus::AllFailed => StatusBanner::error(
                    format!(
                        "⚠ Pulled to {}/{} nodes. Some failed.",
                        summary.succeeded, summary.total
                    ),
                ),
            };
            banner.with_details(summary.lines())
        }
    }
}

pub fn render_broadcast(state: &BroadcastState) -> BroadcastView {
    let status = match &state.lifecycle {
        Lifecycle::Idle => None,
        Lifecycle::Pending => Some(StatusBanner::loading(BROADCAST_PROGRESS_MESSAGE)),
        Lifecycle::Settled(outcome) => Some(broadcast_banner(outcome)),
    };
    BroadcastView {
        model_input: state.model_input.clone(),
        submit_enabled: state.submit_enabled,
        status,
    }
}

/// Pulls one model to every registered node in a single request and reports
/// how many nodes succeeded. The panel stays open after settling; submit is
/// re-enabled whatever the outcome.
pub struct BroadcastPullOrchestrator {
    api: Arc<dyn ConsoleApi>,
    state: Mutex<BroadcastState>,
}

impl BroadcastPullOrchestrator {
    pub fn new(api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            api,
            state: Mutex::new(BroadcastState::default()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BroadcastState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> BroadcastState {
        self.lock_state().clone()
    }

    pub fn view(&self) -> BroadcastView {
        render_broadcast(&self.lock_state())
    }

    pub fn set_model_input(&self, value: impl Into<String>) {
        self.lock_state().model_input = value.into();
    }

    /// `None` while a broadcast is already outstanding.
    pub async fn submit(&self) -> Option<BroadcastOutcome> {
        let request = {
            let mut state = self.lock_state();
            if !state.submit_enabled {
                return None;
            }
            let model = state.model_input.trim().to_string();
            if model.is_empty() {
                let outcome = BroadcastOutcome::Invalid(EMPTY_MODEL_MESSAGE.to_string());
                state.lifecycle = Lifecycle::Settled(outcome.clone());
                return Some(outcome);
            }
            state.submit_enabled = false;
            state.lifecycle = Lifecycle::Pending;
            PullRequest {
                model,
                node_id: None,
            }
        };

        let mut in_flight = BroadcastInFlight {
            orchestrator: self,
            armed: true,
        };
        let result = self.api.pull_model(&request).await;
        in_flight.armed = false;

        let outcome = match result {
            Ok(results) if results.is_empty() => {
                BroadcastOutcome::Failed(NO_NODES_PULLED_MESSAGE.to_string())
            }
            Ok(results) => BroadcastOutcome::Completed(PullSummary::from_results(results)),
            Err(err) => BroadcastOutcome::Failed(transport_message(&err)),
        };
        match &outcome {
            BroadcastOutcome::Completed(summary) => info!(
                model = %request.model,
                succeeded = summary.succeeded,
                total = summary.total,
                "broadcast pull settled"
            ),
            other => warn!(model = %request.model, outcome = ?other, "broadcast pull failed"),
        }

        let mut state = self.lock_state();
        state.lifecycle = Lifecycle::Settled(outcome.clone());
        state.submit_enabled = true;
        Some(outcome)
    }
}

struct BroadcastInFlight<'a> {
    orchestrator: &'a BroadcastPullOrchestrator,
    armed: bool,
}

impl Drop for BroadcastInFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.orchestrator.lock_state();
            state.lifecycle = Lifecycle::Idle;
            state.submit_enabled = true;
        }
    }
}

#[cfg(test)]
#[path = "tests/pull_tests.rs"]
mod tests;
