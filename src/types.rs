use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Task identifier, tagged with its origin.
///
/// Remote ids come from the demo todo API as small integers. Local ids are
/// allocated by the local store and rendered with a `local-` prefix so the
/// two namespaces can never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskId {
    Remote(u32),
    Local(u64),
}

impl TaskId {
    pub fn is_remote(&self) -> bool {
        matches!(self, TaskId::Remote(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, TaskId::Local(_))
    }

    /// Ordering value for the reconciled view. Remote ids order numerically;
    /// local ids fall back to 0 and keep their insertion order under a stable
    /// sort. A low-rigor tie-break, not a contract.
    pub fn sort_key(&self) -> u64 {
        match self {
            TaskId::Remote(id) => u64::from(*id),
            TaskId::Local(_) => 0,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Remote(id) => write!(f, "{}", id),
            TaskId::Local(id) => write!(f, "local-{}", id),
        }
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("local-") {
            let id = rest
                .parse::<u64>()
                .map_err(|_| format!("invalid local task id: {}", s))?;
            return Ok(TaskId::Local(id));
        }
        let id = s
            .parse::<u32>()
            .map_err(|_| format!("invalid task id: {}", s))?;
        Ok(TaskId::Remote(id))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("invalid priority: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub todo: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Unix seconds; only set for local tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
