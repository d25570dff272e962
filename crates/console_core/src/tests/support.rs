//! Scripted [`ConsoleApi`] used by the controller tests. Every call is
//! recorded; replies are queued per endpoint and can be released later
//! through the returned sender, which lets tests choose arrival order.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use shared::{
    domain::{NodeId, NodeStatus, PullStatus},
    protocol::{
        LogEntry, LogPage, LogQuery, ModelTag, NodeDraft, NodeRecord, NodeSummary, PullRequest,
        PullResult,
    },
};
use tokio::sync::oneshot;

use crate::{api::ConsoleApi, error::ClientError};

pub(crate) type Reply<T> = Result<T, ClientError>;

pub(crate) struct Script<Req, T> {
    calls: Mutex<Vec<Req>>,
    replies: Mutex<VecDeque<oneshot::Receiver<Reply<T>>>>,
}

impl<Req: Clone, T> Default for Script<Req, T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        }
    }
}

impl<Req: Clone, T> Script<Req, T> {
    /// Queues a reply that is delivered when the returned sender fires.
    pub(crate) fn deferred(&self) -> oneshot::Sender<Reply<T>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().expect("replies").push_back(rx);
        tx
    }

    pub(crate) fn reply(&self, reply: Reply<T>) {
        let _ = self.deferred().send(reply);
    }

    pub(crate) fn calls(&self) -> Vec<Req> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().expect("calls").len()
    }

    async fn next(&self, request: Req) -> Reply<T> {
        self.calls.lock().expect("calls").push(request);
        let pending = self.replies.lock().expect("replies").pop_front();
        match pending {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ClientError::Transport("reply dropped".into()))),
            None => Err(ClientError::Transport("connection refused".into())),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub(crate) logs: Script<LogQuery, LogPage>,
    pub(crate) nodes: Script<Option<NodeId>, Vec<NodeSummary>>,
    pub(crate) pulls: Script<PullRequest, Vec<PullResult>>,
    pub(crate) models: Script<(), Vec<ModelTag>>,
    pub(crate) saves: Script<(Option<NodeId>, NodeDraft), NodeRecord>,
}

impl FakeApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn query_logs(&self, query: &LogQuery) -> Result<LogPage, ClientError> {
        self.logs.next(query.clone()).await
    }

    async fn list_nodes(&self, node_id: Option<NodeId>) -> Result<Vec<NodeSummary>, ClientError> {
        self.nodes.next(node_id).await
    }

    async fn pull_model(&self, request: &PullRequest) -> Result<Vec<PullResult>, ClientError> {
        self.pulls.next(request.clone()).await
    }

    async fn list_models(&self) -> Result<Vec<ModelTag>, ClientError> {
        self.models.next(()).await
    }

    async fn save_node(
        &self,
        node_id: Option<NodeId>,
        draft: &NodeDraft,
    ) -> Result<NodeRecord, ClientError> {
        self.saves.next((node_id, draft.clone())).await
    }
}

/// Lets spawned tasks run until `done` holds.
pub(crate) async fn settle_until(mut done: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

pub(crate) fn entry(message: &str) -> LogEntry {
    LogEntry {
        timestamp: "2025-03-01 12:00:00,000".into(),
        level: shared::domain::LogLevel::Info,
        logger: "proxy".into(),
        message: message.into(),
    }
}

pub(crate) fn page(messages: &[&str], count: u64, offset: u64) -> LogPage {
    LogPage {
        results: messages.iter().map(|m| entry(m)).collect(),
        count,
        offset: Some(offset),
        limit: None,
    }
}

pub(crate) fn node(id: i64, name: &str, models: &[&str]) -> NodeSummary {
    NodeSummary {
        id: NodeId(id),
        name: name.into(),
        address: format!("http://{}:11434", name.to_ascii_lowercase()),
        status: NodeStatus::Active,
        active_requests: 0,
        latency: None,
        models: models.iter().map(|m| m.to_string()).collect(),
    }
}

pub(crate) fn pull_result(id: i64, name: &str, ok: bool, message: &str) -> PullResult {
    PullResult {
        node_id: Some(NodeId(id)),
        node_name: name.into(),
        status: if ok { PullStatus::Success } else { PullStatus::Error },
        message: message.into(),
    }
}
