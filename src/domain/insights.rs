//! Transcript enrichment: task variants, their prompts and payload shapes, and the
//! best-effort aggregate built from them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::entities::MeetingId;
use super::errors::{RetryError, ServiceFailure};

/// Closed set of enrichment tasks run against a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentTask {
    ActionItems,
    KeyTopics,
    Sentiment,
    FollowUps,
}

impl EnrichmentTask {
    pub const ALL: [EnrichmentTask; 4] = [
        EnrichmentTask::ActionItems,
        EnrichmentTask::KeyTopics,
        EnrichmentTask::Sentiment,
        EnrichmentTask::FollowUps,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnrichmentTask::ActionItems => "action_items",
            EnrichmentTask::KeyTopics => "key_topics",
            EnrichmentTask::Sentiment => "sentiment",
            EnrichmentTask::FollowUps => "follow_ups",
        }
    }

    /// Prompt for this task. The first line names the task; the transcript follows.
    pub fn prompt(self, transcript: &str) -> String {
        let (headline, shape) = match self {
            EnrichmentTask::ActionItems => (
                "Extract the action items from the meeting transcript below.",
                r#"{"action_items": [{"task": "...", "owner": "... or null", "deadline": "YYYY-MM-DD or null", "priority": "high|medium|low or null"}]}"#,
            ),
            EnrichmentTask::KeyTopics => (
                "Identify the key topics discussed in the meeting transcript below.",
                r#"{"key_topics": ["..."], "primary_focus": "..."}"#,
            ),
            EnrichmentTask::Sentiment => (
                "Assess the sentiment and tone of the meeting transcript below.",
                r#"{"sentiment": {"score": 0.0-1.0, "summary": "...", "relationship_health": "strong|stable|at_risk"}}"#,
            ),
            EnrichmentTask::FollowUps => (
                "Recommend follow-up steps based on the meeting transcript below.",
                r#"{"follow_ups": ["..."]}"#,
            ),
        };
        format!(
            "{headline}\nRespond with JSON only, shaped as:\n{shape}\n\nTranscript:\n{transcript}"
        )
    }

    /// Parse a raw response into this task's payload.
    pub fn parse(self, raw: &str) -> Result<InsightPayload, ServiceFailure> {
        let clean = sanitize_json(raw);
        let malformed = |e: serde_json::Error| {
            ServiceFailure::Malformed(format!("{} response: {}", self.name(), e))
        };
        let payload = match self {
            EnrichmentTask::ActionItems => {
                let body: ActionItemsBody = serde_json::from_str(&clean).map_err(malformed)?;
                InsightPayload::ActionItems(body.action_items)
            }
            EnrichmentTask::KeyTopics => {
                InsightPayload::KeyTopics(serde_json::from_str(&clean).map_err(malformed)?)
            }
            EnrichmentTask::Sentiment => {
                let body: SentimentBody = serde_json::from_str(&clean).map_err(malformed)?;
                if !(0.0..=1.0).contains(&body.sentiment.score) {
                    return Err(ServiceFailure::Malformed(format!(
                        "sentiment score {} outside [0, 1]",
                        body.sentiment.score
                    )));
                }
                InsightPayload::Sentiment(body.sentiment)
            }
            EnrichmentTask::FollowUps => {
                let body: FollowUpsBody = serde_json::from_str(&clean).map_err(malformed)?;
                InsightPayload::FollowUps(body.follow_ups)
            }
        };
        Ok(payload)
    }
}

impl fmt::Display for EnrichmentTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strip markdown code fences or surrounding prose from a JSON reply.
pub fn sanitize_json(raw_text: &str) -> String {
    let trimmed = raw_text.trim();

    if trimmed.starts_with("```") {
        let without_prefix = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim().to_string();
        }
        return without_prefix.trim().to_string();
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub task: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTopics {
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub primary_focus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub score: f64,
    pub summary: String,
    pub relationship_health: String,
}

#[derive(Deserialize)]
struct ActionItemsBody {
    action_items: Vec<ActionItem>,
}

#[derive(Deserialize)]
struct SentimentBody {
    sentiment: Sentiment,
}

#[derive(Deserialize)]
struct FollowUpsBody {
    follow_ups: Vec<String>,
}

/// Structured result of one enrichment task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InsightPayload {
    ActionItems(Vec<ActionItem>),
    KeyTopics(KeyTopics),
    Sentiment(Sentiment),
    FollowUps(Vec<String>),
}

impl InsightPayload {
    pub fn task(&self) -> EnrichmentTask {
        match self {
            InsightPayload::ActionItems(_) => EnrichmentTask::ActionItems,
            InsightPayload::KeyTopics(_) => EnrichmentTask::KeyTopics,
            InsightPayload::Sentiment(_) => EnrichmentTask::Sentiment,
            InsightPayload::FollowUps(_) => EnrichmentTask::FollowUps,
        }
    }
}

/// Why a task ended without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightErrorKind {
    RetriesExhausted,
    Rejected,
    Cancelled,
    /// The task itself crashed (e.g. a panic in the worker).
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightError {
    pub kind: InsightErrorKind,
    pub message: String,
}

impl From<&RetryError> for InsightError {
    fn from(err: &RetryError) -> Self {
        let kind = match err {
            RetryError::RetriesExhausted { .. } => InsightErrorKind::RetriesExhausted,
            RetryError::Rejected { .. } => InsightErrorKind::Rejected,
            RetryError::Cancelled { .. } => InsightErrorKind::Cancelled,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Per-task lifecycle. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Retrying { attempt: u32 },
    Succeeded,
    Failed,
}

/// Outcome of one task: exactly one of value / error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "InsightResultRepr")]
pub struct InsightResult {
    task: EnrichmentTask,
    outcome: Result<InsightPayload, InsightError>,
    attempts: u32,
}

#[derive(Serialize)]
struct InsightResultRepr {
    task: EnrichmentTask,
    value: Option<InsightPayload>,
    error: Option<InsightError>,
    attempts: u32,
}

impl From<InsightResult> for InsightResultRepr {
    fn from(r: InsightResult) -> Self {
        let (value, error) = match r.outcome {
            Ok(v) => (Some(v), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            task: r.task,
            value,
            error,
            attempts: r.attempts,
        }
    }
}

impl InsightResult {
    pub fn succeeded(payload: InsightPayload, attempts: u32) -> Self {
        Self {
            task: payload.task(),
            outcome: Ok(payload),
            attempts,
        }
    }

    pub fn failed(task: EnrichmentTask, error: InsightError, attempts: u32) -> Self {
        Self {
            task,
            outcome: Err(error),
            attempts,
        }
    }

    pub fn task(&self) -> EnrichmentTask {
        self.task
    }

    pub fn value(&self) -> Option<&InsightPayload> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&InsightError> {
        self.outcome.as_ref().err()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> TaskState {
        match self.outcome {
            Ok(_) => TaskState::Succeeded,
            Err(_) => TaskState::Failed,
        }
    }
}

/// Insights stored on the meeting record. A `None` field means the task failed
/// or was not requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingInsights {
    #[serde(default)]
    pub action_items: Option<Vec<ActionItem>>,
    #[serde(default)]
    pub key_topics: Option<KeyTopics>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub follow_ups: Option<Vec<String>>,
    /// Task name -> error message for tasks that ended without a value.
    #[serde(default)]
    pub errors: BTreeMap<EnrichmentTask, String>,
}

/// Pre-meeting brief generated for meetings with an external contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingPrep {
    pub contact_summary: String,
    pub recent_interactions: String,
    #[serde(alias = "suggested_talking_points")]
    pub suggested_topics: Vec<String>,
    #[serde(default)]
    pub pending_action_items: Vec<String>,
}

impl MeetingPrep {
    pub fn parse(raw: &str) -> Result<Self, ServiceFailure> {
        serde_json::from_str(&sanitize_json(raw))
            .map_err(|e| ServiceFailure::Malformed(format!("meeting prep response: {}", e)))
    }
}

/// Overall shape of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Complete,
    Partial,
    Failed,
}

/// Aggregate of one transcript analysis. Holds one entry per requested task.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub meeting_id: MeetingId,
    pub results: BTreeMap<EnrichmentTask, InsightResult>,
    pub failed_tasks: BTreeSet<EnrichmentTask>,
}

impl AnalysisReport {
    pub fn new(meeting_id: MeetingId, results: Vec<InsightResult>) -> Self {
        let failed_tasks = results
            .iter()
            .filter(|r| r.error().is_some())
            .map(|r| r.task())
            .collect();
        let results = results.into_iter().map(|r| (r.task(), r)).collect();
        Self {
            meeting_id,
            results,
            failed_tasks,
        }
    }

    pub fn outcome(&self) -> AnalysisOutcome {
        if self.failed_tasks.is_empty() {
            AnalysisOutcome::Complete
        } else if self.failed_tasks.len() == self.results.len() {
            AnalysisOutcome::Failed
        } else {
            AnalysisOutcome::Partial
        }
    }

    /// Fold successful payloads into the shape stored on the meeting.
    pub fn to_meeting_insights(&self) -> MeetingInsights {
        let mut insights = MeetingInsights::default();
        for result in self.results.values() {
            match (result.value(), result.error()) {
                (Some(InsightPayload::ActionItems(items)), _) => {
                    insights.action_items = Some(items.clone())
                }
                (Some(InsightPayload::KeyTopics(topics)), _) => {
                    insights.key_topics = Some(topics.clone())
                }
                (Some(InsightPayload::Sentiment(s)), _) => insights.sentiment = Some(s.clone()),
                (Some(InsightPayload::FollowUps(f)), _) => insights.follow_ups = Some(f.clone()),
                (None, Some(err)) => {
                    insights.errors.insert(result.task(), err.message.clone());
                }
                (None, None) => {}
            }
        }
        insights
    }
}
