use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{LogLevel, LogSource, NodeId, NodeStatus, PullStatus};

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Query string sent to the log endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default)]
    pub source: LogSource,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "nullable_string")]
    pub timestamp: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default, deserialize_with = "nullable_string")]
    pub logger: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub message: String,
}

/// One page of log lines.
///
/// `offset` is the offset the service actually served, which may differ from
/// the requested one; it is absent on older services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    #[serde(default)]
    pub results: Vec<LogEntry>,
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub address: String,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub active_requests: u64,
    /// Seconds; `None` when the node has not been probed yet.
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeListResponse {
    #[serde(default)]
    pub nodes: Vec<NodeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_active_requests: Option<u64>,
}

/// Pull a model to one node, or to every node when `node_id` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub node_name: String,
    #[serde(default)]
    pub status: PullStatus,
    #[serde(default, deserialize_with = "nullable_string")]
    pub message: String,
}

impl PullResult {
    pub fn succeeded(&self) -> bool {
        self.status == PullStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PullResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTag {
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// Body written to the node registry on add/edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDraft {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_page_tolerates_nulls_and_unknown_levels() {
        let page: LogPage = serde_json::from_str(
            r#"{"count":2,"offset":0,"limit":100,"results":[
                {"timestamp":"2025-01-01 10:00:00,123","level":"warning","logger":null,"message":"slow"},
                {"timestamp":null,"level":"TRACE","logger":"proxy","message":"x","raw":{}}
            ]}"#,
        )
        .expect("decode");

        assert_eq!(page.results[0].level, LogLevel::Warning);
        assert_eq!(page.results[0].logger, "");
        assert_eq!(page.results[1].level, LogLevel::Other("TRACE".into()));
        assert_eq!(page.results[1].timestamp, "");
    }

    #[test]
    fn missing_level_is_an_empty_other() {
        let entry: LogEntry = serde_json::from_str(r#"{"message":"m","level":null}"#).expect("decode");
        assert_eq!(entry.level, LogLevel::default());
        assert_eq!(entry.level.label(), "");
    }

    #[test]
    fn node_summary_decodes_registry_payload() {
        let body = r#"{"nodes":[{"id":3,"name":"CPU","address":"http://ollama:11434",
            "status":"standby","active_requests":0,"latency":null,"models":[]}],
            "total_active_requests":0}"#;
        let list: NodeListResponse = serde_json::from_str(body).expect("decode");
        let node = &list.nodes[0];
        assert_eq!(node.id, NodeId(3));
        assert_eq!(node.status, NodeStatus::Standby);
        assert_eq!(node.latency, None);
        assert!(node.models.is_empty());
    }

    #[test]
    fn pull_result_treats_unknown_status_as_error() {
        let result: PullResult =
            serde_json::from_str(r#"{"node_id":1,"node_name":"a","status":"timeout","message":"m"}"#)
                .expect("decode");
        assert_eq!(result.status, PullStatus::Error);
        assert!(!result.succeeded());
    }

    #[test]
    fn null_model_list_decodes_as_empty() {
        let body = r#"{"nodes":[{"id":4,"name":"Edge","status":"healthy","models":null},
            {"id":5,"name":"Spare","status":"healthy"}]}"#;
        let list: NodeListResponse = serde_json::from_str(body).expect("decode");
        assert_eq!(list.nodes.len(), 2);
        assert!(list.nodes.iter().all(|node| node.models.is_empty()));
    }

    #[test]
    fn pull_result_without_status_is_an_error() {
        let response: PullResponse = serde_json::from_str(
            r#"{"model":"llama3","results":[
                {"node_id":1,"node_name":"a","status":"success","message":"ok"},
                {"node_id":2,"node_name":"b","message":"unreachable"}
            ]}"#,
        )
        .expect("decode");
        let results = response.results.expect("results");
        assert!(results[0].succeeded());
        assert_eq!(results[1].status, PullStatus::Error);
        assert!(!results[1].succeeded());
    }

    #[test]
    fn broadcast_pull_request_omits_node_id() {
        let body = serde_json::to_value(PullRequest {
            model: "llama3".into(),
            node_id: None,
        })
        .expect("encode");
        assert_eq!(body, serde_json::json!({"model": "llama3"}));
    }
}
