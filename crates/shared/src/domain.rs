use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(NodeId);

/// Severity attached to a log line by the service.
///
/// Matching is case-insensitive; unrecognized names are kept verbatim in
/// [`LogLevel::Other`], and a missing level is `Other("")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    Other(String),
}

impl LogLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Self::Critical,
            "ERROR" => Self::Error,
            "WARNING" => Self::Warning,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    /// Upper-cased display name; empty for a missing level.
    pub fn label(&self) -> String {
        match self {
            Self::Critical => "CRITICAL".to_string(),
            Self::Error => "ERROR".to_string(),
            Self::Warning => "WARNING".to_string(),
            Self::Info => "INFO".to_string(),
            Self::Debug => "DEBUG".to_string(),
            Self::Other(raw) => raw.to_uppercase(),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<Option<String>> for LogLevel {
    fn from(value: Option<String>) -> Self {
        value.as_deref().map(Self::parse).unwrap_or_default()
    }
}

impl From<LogLevel> for String {
    fn from(value: LogLevel) -> Self {
        value.label()
    }
}

/// Which log file the service reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    #[default]
    Django,
    Proxy,
}

impl LogSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Django => "django",
            Self::Proxy => "proxy",
        }
    }
}

impl std::str::FromStr for LogSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "django" => Ok(Self::Django),
            "proxy" => Ok(Self::Proxy),
            other => Err(format!("unknown log source '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Active,
    Standby,
    Other(String),
}

impl NodeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Standby => "standby",
            Self::Other(raw) => raw,
        }
    }
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for NodeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "active" => Self::Active,
            "standby" => Self::Standby,
            _ => Self::Other(value),
        }
    }
}

impl From<NodeStatus> for String {
    fn from(value: NodeStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Anything other than `success`, including a missing status, is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullStatus {
    Success,
    #[default]
    #[serde(other)]
    Error,
}
