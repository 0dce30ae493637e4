use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bucket label for responses that omit a field or leave it blank.
pub const UNSPECIFIED: &str = "unspecified";

/// Keys the server stamps onto every record. Client-supplied values under
/// these names are discarded before the record is stored.
pub const RESERVED_KEYS: [&str; 5] = ["id", "timestamp", "ip", "completionTime", "submitted"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    Students,
    Professors,
}

impl Population {
    pub fn as_str(self) -> &'static str {
        match self {
            Population::Students => "students",
            Population::Professors => "professors",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Population::Students => 0,
            Population::Professors => 1,
        }
    }
}

/// One submitted survey record. The typed envelope is stamped by the server;
/// everything the respondent answered lives in the flattened `answers` bag
/// as free-form JSON (strings, numbers, booleans, lists of strings).
///
/// Records are immutable once appended. A correction is a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: u64,
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "ip")]
    pub origin: String,
    #[serde(default)]
    pub completion_time: Value,
    #[serde(default)]
    pub submitted: bool,
    #[serde(flatten)]
    pub answers: Map<String, Value>,
}

impl Response {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.answers.get(name)
    }

    /// A record counts as completed when the server accepted it as a full
    /// submission or the respondent set the `completed` answer themselves.
    pub fn is_completed(&self) -> bool {
        self.submitted || matches!(self.answers.get("completed"), Some(Value::Bool(true)))
    }
}

/// Scalar counts and rates over the full corpus. Rates are JSON numbers
/// rounded to one decimal, uniformly across every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_participants: u64,
    pub student_count: u64,
    pub professor_count: u64,
    pub completion_rate: f64,
    pub average_time: f64,
}

/// Named label-to-count distributions for the dashboard. Key order is first
/// occurrence and carries no meaning for consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    pub satisfaction_levels: IndexMap<String, u64>,
    pub feature_rankings: IndexMap<String, f64>,
    pub by_major: IndexMap<String, u64>,
    pub by_experience: IndexMap<String, u64>,
}

/// The full derived artifact: a pure function of the two collections at the
/// time of computation. No state carries over between recomputations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub summary: Summary,
    pub charts: Charts,
    pub insights: Vec<String>,
}

/// Snapshot as written to the store. The timestamp records the persistence
/// moment and is excluded from snapshot equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSnapshot {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    pub last_updated: DateTime<Utc>,
}
