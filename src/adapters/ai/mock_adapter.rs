//! Mock insight adapter for running without API calls.
//!
//! Returns canned JSON per prompt kind. Failures come from an injected
//! [`FaultPlan`] so tests can force them deterministically.

use crate::domain::{EnrichmentTask, ServiceFailure};
use crate::ports::InsightService;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// What a prompt asks for, read from its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Insight(EnrichmentTask),
    Prep,
    Generic,
}

impl PromptKind {
    pub fn classify(prompt: &str) -> Self {
        let headline = prompt.lines().next().unwrap_or_default().to_lowercase();
        if headline.contains("prepare") {
            PromptKind::Prep
        } else if headline.contains("action item") {
            PromptKind::Insight(EnrichmentTask::ActionItems)
        } else if headline.contains("key topic") {
            PromptKind::Insight(EnrichmentTask::KeyTopics)
        } else if headline.contains("sentiment") {
            PromptKind::Insight(EnrichmentTask::Sentiment)
        } else if headline.contains("follow-up") {
            PromptKind::Insight(EnrichmentTask::FollowUps)
        } else {
            PromptKind::Generic
        }
    }
}

/// Injected failure for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Rate limit, timeout or unavailable.
    Transient,
    /// Invalid request; never recovers.
    Permanent,
    /// Successful call whose body is not JSON.
    Garbled,
}

/// Decides whether the `call_index`-th call (0-based, per kind) fails.
pub trait FaultPlan: Send + Sync {
    fn next_fault(&self, kind: PromptKind, call_index: u32) -> Option<Fault>;
}

/// Never fails.
pub struct NoFaults;

impl FaultPlan for NoFaults {
    fn next_fault(&self, _kind: PromptKind, _call_index: u32) -> Option<Fault> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    First(u32, Fault),
    Always(Fault),
}

/// Per-kind fault script. Kinds without a rule never fail.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFaults {
    rules: HashMap<PromptKind, Rule>,
}

impl ScriptedFaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` calls of `kind`, then succeed.
    pub fn fail_first(mut self, kind: PromptKind, n: u32, fault: Fault) -> Self {
        self.rules.insert(kind, Rule::First(n, fault));
        self
    }

    pub fn fail_always(mut self, kind: PromptKind, fault: Fault) -> Self {
        self.rules.insert(kind, Rule::Always(fault));
        self
    }
}

impl FaultPlan for ScriptedFaults {
    fn next_fault(&self, kind: PromptKind, call_index: u32) -> Option<Fault> {
        match self.rules.get(&kind)? {
            Rule::First(n, fault) if call_index < *n => Some(*fault),
            Rule::First(..) => None,
            Rule::Always(fault) => Some(*fault),
        }
    }
}

const POSITIVE_WORDS: [&str; 6] = [
    "great",
    "excellent",
    "excited",
    "interested",
    "impressed",
    "perfect",
];
const NEGATIVE_WORDS: [&str; 6] = [
    "concern",
    "worried",
    "issue",
    "problem",
    "disappointed",
    "confused",
];

const TOPICS: [&str; 6] = [
    "Product capabilities and features",
    "Implementation timeline and resources",
    "Pricing and contract terms",
    "Technical integration requirements",
    "Team training and onboarding",
    "Success metrics and ROI",
];

const FOLLOW_UPS: [&str; 5] = [
    "Send meeting summary and action items within 24 hours",
    "Schedule follow-up meeting for next week to review progress",
    "Introduce relevant team members for technical discussion",
    "Share case studies and customer success stories",
    "Prepare detailed proposal addressing discussed requirements",
];

/// Mock insight adapter.
///
/// Responses depend only on the prompt text, never on call order.
/// Simulates network latency with configurable delay.
pub struct MockInsightAdapter {
    /// Simulated network delay in milliseconds.
    delay_ms: u64,
    faults: Arc<dyn FaultPlan>,
    calls: Mutex<HashMap<PromptKind, u32>>,
}

impl MockInsightAdapter {
    /// Create a new mock adapter with default delay (100ms).
    pub fn new() -> Self {
        Self::with_delay(100)
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            faults: Arc::new(NoFaults),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_faults(mut self, faults: Arc<dyn FaultPlan>) -> Self {
        self.faults = faults;
        self
    }

    /// Calls received for `kind`, failed ones included.
    pub fn calls(&self, kind: PromptKind) -> u32 {
        self.counter().get(&kind).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.counter().values().sum()
    }

    fn counter(&self) -> std::sync::MutexGuard<'_, HashMap<PromptKind, u32>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bump the counter for `kind`, returning the 0-based index of this call.
    fn record_call(&self, kind: PromptKind) -> u32 {
        let mut calls = self.counter();
        let count = calls.entry(kind).or_insert(0);
        let index = *count;
        *count += 1;
        index
    }

    fn respond(kind: PromptKind, prompt: &str) -> String {
        let body = match kind {
            PromptKind::Insight(EnrichmentTask::ActionItems) => action_items(transcript_of(prompt)),
            PromptKind::Insight(EnrichmentTask::KeyTopics) => key_topics(transcript_of(prompt)),
            PromptKind::Insight(EnrichmentTask::Sentiment) => sentiment(transcript_of(prompt)),
            PromptKind::Insight(EnrichmentTask::FollowUps) => follow_ups(transcript_of(prompt)),
            PromptKind::Prep => meeting_prep(prompt),
            PromptKind::Generic => json!({
                "response": "I've analyzed the content and generated insights.",
            }),
        };
        serde_json::to_string_pretty(&body).unwrap_or_default()
    }
}

impl Default for MockInsightAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InsightService for MockInsightAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceFailure> {
        let kind = PromptKind::classify(prompt);
        let call_index = self.record_call(kind);
        info!(
            ?kind,
            call_index,
            prompt_len = prompt.len(),
            "[MOCK] Simulating insight generation"
        );

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        match self.faults.next_fault(kind, call_index) {
            Some(Fault::Transient) => Err(ServiceFailure::Transient(
                "RateLimitError: Rate limit exceeded. Please retry after a short delay.".into(),
            )),
            Some(Fault::Permanent) => Err(ServiceFailure::Permanent(
                "InvalidRequestError: Invalid request format or parameters.".into(),
            )),
            Some(Fault::Garbled) => Ok("Sure! Here is what I found in the meeting.".into()),
            None => Ok(Self::respond(kind, prompt)),
        }
    }
}

/// Text after the `Transcript:` marker, or the whole prompt.
fn transcript_of(prompt: &str) -> &str {
    prompt
        .split_once("\nTranscript:\n")
        .map_or(prompt, |(_, transcript)| transcript)
}

/// First `Name:` speaker label in the transcript.
fn first_speaker(transcript: &str) -> Option<&str> {
    transcript.split(':').next().and_then(|head| {
        let name = head.split_whitespace().last()?;
        let mut chars = name.chars();
        let capitalised = chars.next().is_some_and(char::is_uppercase)
            && chars.all(char::is_lowercase);
        capitalised.then_some(name)
    })
}

/// `take` items from `pool`, rotated by the transcript length.
fn rotated<'a>(pool: &[&'a str], transcript: &str, take: usize) -> Vec<&'a str> {
    let offset = transcript.len() % pool.len();
    pool.iter().cycle().skip(offset).take(take).copied().collect()
}

fn action_items(transcript: &str) -> serde_json::Value {
    let owner = first_speaker(transcript).unwrap_or("Team member");
    json!({
        "action_items": [
            {
                "task": "Send follow-up email with discussed materials",
                "owner": owner,
                "deadline": "2025-11-20",
                "priority": "high"
            },
            {
                "task": "Schedule technical review session",
                "owner": owner,
                "deadline": "2025-11-22",
                "priority": "medium"
            },
            {
                "task": "Prepare proposal with updated pricing",
                "owner": owner,
                "deadline": "2025-11-25",
                "priority": "high"
            }
        ]
    })
}

fn key_topics(transcript: &str) -> serde_json::Value {
    let topics = rotated(&TOPICS, transcript, 4);
    json!({
        "key_topics": topics,
        "primary_focus": topics.first(),
    })
}

fn sentiment(transcript: &str) -> serde_json::Value {
    let lower = transcript.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    let (score, summary, health) = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => (
            0.75,
            "Positive and engaged. The conversation was productive with clear interest and forward momentum.",
            "strong",
        ),
        std::cmp::Ordering::Less => (
            0.45,
            "Some concerns raised. Need to address blockers and rebuild confidence.",
            "at_risk",
        ),
        std::cmp::Ordering::Equal => (
            0.6,
            "Neutral and professional. Standard business discussion with no major issues.",
            "stable",
        ),
    };
    json!({
        "sentiment": {
            "score": score,
            "summary": summary,
            "relationship_health": health
        }
    })
}

fn follow_ups(transcript: &str) -> serde_json::Value {
    json!({ "follow_ups": rotated(&FOLLOW_UPS, transcript, 3) })
}

fn meeting_prep(prompt: &str) -> serde_json::Value {
    let contact = prompt
        .lines()
        .find_map(|line| line.strip_prefix("Contact: "))
        .and_then(|rest| rest.split(" - ").next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("the contact");
    let first_meeting = prompt.contains("first meeting with this contact");

    let (summary, recent) = if first_meeting {
        (
            format!("This is your first meeting with {contact}. Use it to understand their priorities and decision process."),
            "No previous interactions on record.".to_string(),
        )
    } else {
        (
            format!("You have an established relationship with {contact}, having met multiple times over the past few months. They are engaged and responsive, showing strong interest in your solution."),
            "Your last meeting covered technical requirements and implementation timelines. The contact expressed enthusiasm about key features and mentioned they're in the decision-making phase with executive approval pending.".to_string(),
        )
    };

    json!({
        "contact_summary": summary,
        "recent_interactions": recent,
        "suggested_topics": [
            "Follow up on action items from last meeting",
            "Discuss implementation timeline and milestones",
            "Address any remaining concerns or blockers",
            "Clarify next steps in the evaluation process"
        ],
        "pending_action_items": [
            "Review provided technical documentation",
            "Schedule meeting with decision makers",
            "Finalize contract terms and pricing"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InsightPayload, MeetingPrep};

    const TRANSCRIPT: &str = "Sarah: The demo went great. Jennifer: I'm impressed, no concerns so far.";

    #[test]
    fn test_classify_by_headline() {
        for task in EnrichmentTask::ALL {
            assert_eq!(
                PromptKind::classify(&task.prompt(TRANSCRIPT)),
                PromptKind::Insight(task)
            );
        }
        assert_eq!(
            PromptKind::classify("You are helping prepare someone for an upcoming meeting."),
            PromptKind::Prep
        );
        assert_eq!(PromptKind::classify("Hello"), PromptKind::Generic);
    }

    #[tokio::test]
    async fn test_responses_parse_for_every_task() {
        let adapter = MockInsightAdapter::with_delay(0);
        for task in EnrichmentTask::ALL {
            let raw = adapter.generate(&task.prompt(TRANSCRIPT)).await.unwrap();
            let payload = task.parse(&raw).unwrap();
            assert_eq!(payload.task(), task);
        }
        assert_eq!(adapter.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_sentiment_keyword_scoring() {
        let adapter = MockInsightAdapter::with_delay(0);
        let task = EnrichmentTask::Sentiment;

        let raw = adapter.generate(&task.prompt(TRANSCRIPT)).await.unwrap();
        match task.parse(&raw).unwrap() {
            InsightPayload::Sentiment(s) => {
                assert_eq!(s.score, 0.75);
                assert_eq!(s.relationship_health, "strong");
            }
            other => panic!("unexpected payload {:?}", other),
        }

        let gloomy = "Amanda: I'm worried about the issue with onboarding.";
        let raw = adapter.generate(&task.prompt(gloomy)).await.unwrap();
        match task.parse(&raw).unwrap() {
            InsightPayload::Sentiment(s) => assert_eq!(s.relationship_health, "at_risk"),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_action_items_owner_is_first_speaker() {
        let adapter = MockInsightAdapter::with_delay(0);
        let task = EnrichmentTask::ActionItems;
        let raw = adapter.generate(&task.prompt(TRANSCRIPT)).await.unwrap();
        match task.parse(&raw).unwrap() {
            InsightPayload::ActionItems(items) => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[0].owner.as_deref(), Some("Sarah"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prep_names_contact() {
        let adapter = MockInsightAdapter::with_delay(0);
        let raw = adapter
            .generate("You are helping prepare someone for an upcoming meeting.\nContact: David Thompson - CTO at TechStartup")
            .await
            .unwrap();
        let prep = MeetingPrep::parse(&raw).unwrap();
        assert!(prep.contact_summary.contains("David Thompson"));
        assert_eq!(prep.suggested_topics.len(), 4);
    }

    #[tokio::test]
    async fn test_scripted_faults() {
        let kind = PromptKind::Insight(EnrichmentTask::FollowUps);
        let faults = ScriptedFaults::new().fail_first(kind, 2, Fault::Transient);
        let adapter = MockInsightAdapter::with_delay(0).with_faults(Arc::new(faults));
        let prompt = EnrichmentTask::FollowUps.prompt(TRANSCRIPT);

        assert!(matches!(
            adapter.generate(&prompt).await,
            Err(ServiceFailure::Transient(_))
        ));
        assert!(adapter.generate(&prompt).await.is_err());
        assert!(adapter.generate(&prompt).await.is_ok());
        assert_eq!(adapter.calls(kind), 3);
    }

    #[tokio::test]
    async fn test_garbled_output_is_malformed() {
        let kind = PromptKind::Insight(EnrichmentTask::KeyTopics);
        let faults = ScriptedFaults::new().fail_always(kind, Fault::Garbled);
        let adapter = MockInsightAdapter::with_delay(0).with_faults(Arc::new(faults));

        let raw = adapter
            .generate(&EnrichmentTask::KeyTopics.prompt(TRANSCRIPT))
            .await
            .unwrap();
        assert!(matches!(
            EnrichmentTask::KeyTopics.parse(&raw),
            Err(ServiceFailure::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_responses_are_deterministic() {
        let adapter = MockInsightAdapter::with_delay(0);
        let prompt = EnrichmentTask::KeyTopics.prompt(TRANSCRIPT);
        let first = adapter.generate(&prompt).await.unwrap();
        let second = adapter.generate(&prompt).await.unwrap();
        assert_eq!(first, second);
    }
}
