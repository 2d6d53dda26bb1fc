//! Pre-meeting preparation for meetings with an external contact.
//!
//! Builds a brief from the contact and recent history, asks the InsightService
//! (with retries) and stores the result on the meeting.

use crate::domain::{
    Contact, DomainError, MeetingId, MeetingPatch, MeetingPrep, MeetingRecord,
};
use crate::ports::{ContactDirectory, InsightService, MeetingStore};
use crate::shared::retry::{RetryPolicy, RetryingCaller};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::info;

/// Past meetings fetched per contact.
const HISTORY_LIMIT: usize = 5;
/// Past meetings spelled out in the prompt.
const HISTORY_IN_PROMPT: usize = 3;

pub struct PrepService {
    insight: Arc<dyn InsightService>,
    store: Arc<dyn MeetingStore>,
    contacts: Arc<dyn ContactDirectory>,
    policy: RetryPolicy,
}

impl PrepService {
    pub fn new(
        insight: Arc<dyn InsightService>,
        store: Arc<dyn MeetingStore>,
        contacts: Arc<dyn ContactDirectory>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            insight,
            store,
            contacts,
            policy,
        }
    }

    /// Generate and store a prep brief. Returns the updated meeting.
    ///
    /// # Errors
    /// Caller errors (`MeetingNotFound`, `NoExternalContact`, `ContactNotFound`) abort
    /// before any upstream call; exhausted or rejected generation is `DomainError::Insight`.
    pub async fn prepare_meeting(
        &self,
        meeting_id: &MeetingId,
    ) -> Result<MeetingRecord, DomainError> {
        let meeting = self
            .store
            .get_meeting(meeting_id)
            .await?
            .ok_or_else(|| DomainError::MeetingNotFound(meeting_id.clone()))?;
        let contact_id = meeting
            .contact_id
            .clone()
            .ok_or_else(|| DomainError::NoExternalContact(meeting_id.clone()))?;
        let contact = self
            .contacts
            .get_contact(&contact_id)
            .await?
            .ok_or_else(|| DomainError::ContactNotFound(contact_id.clone()))?;
        let history = self
            .contacts
            .historical_meetings(&contact_id, meeting.start, HISTORY_LIMIT)
            .await?;

        let prompt: Arc<str> = Arc::from(build_prep_prompt(&contact, &history));
        let prep = RetryingCaller::new(self.policy)
            .call("meeting_prep", |_| {
                let insight = Arc::clone(&self.insight);
                let prompt = Arc::clone(&prompt);
                async move {
                    let raw = insight.generate(&prompt).await?;
                    MeetingPrep::parse(&raw)
                }
            })
            .await?;

        let updated = self
            .store
            .update_meeting(
                meeting_id,
                MeetingPatch {
                    prep: Some(prep),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            meeting_id = %meeting_id,
            contact_id = %contact_id,
            history = history.len(),
            "meeting prep generated"
        );
        Ok(updated)
    }
}

/// Prompt for the prep brief. `history` is most-recent-first.
pub fn build_prep_prompt(contact: &Contact, history: &[MeetingRecord]) -> String {
    let mut history_str = String::new();
    if history.is_empty() {
        history_str.push_str("\n\nThis is your first meeting with this contact.");
    } else {
        let _ = writeln!(history_str, "\n\nPast meetings ({} total):", history.len());
        for m in history.iter().take(HISTORY_IN_PROMPT) {
            let _ = writeln!(history_str, "- {}: {}", m.start.format("%Y-%m-%d"), m.title);
            if let Some(summary) = &m.summary {
                let _ = writeln!(history_str, "  Summary: {}", summary);
            }
            if !m.action_items.is_empty() {
                let items: Vec<&str> = m.action_items.iter().take(2).map(String::as_str).collect();
                let _ = writeln!(history_str, "  Action items: {}", items.join(", "));
            }
        }
    }

    format!(
        "You are helping prepare someone for an upcoming meeting.\n\
         \n\
         Contact Information:\n\
         Contact: {} - {} at {}\
         {}\n\
         \n\
         Respond with JSON only, shaped as:\n\
         {{\"contact_summary\": \"2-3 sentences on who they are and the relationship\", \
         \"recent_interactions\": \"what was discussed before\", \
         \"suggested_topics\": [\"3-5 talking points\"], \
         \"pending_action_items\": [\"open items from past meetings\"]}}",
        contact.name, contact.role, contact.company, history_str
    )
}
