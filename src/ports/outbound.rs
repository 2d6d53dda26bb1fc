//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::{
    Contact, ContactId, DomainError, MeetingId, MeetingPatch, MeetingRecord, OwnerId,
    ServiceFailure,
};

/// Meeting store. Record persistence lives behind this port; the core owns none.
#[async_trait::async_trait]
pub trait MeetingStore: Send + Sync {
    async fn owner_exists(&self, owner_id: &OwnerId) -> Result<bool, DomainError>;

    /// Meetings of `owner_id` that start on `date`.
    async fn list_meetings(
        &self,
        owner_id: &OwnerId,
        date: NaiveDate,
    ) -> Result<Vec<MeetingRecord>, DomainError>;

    async fn get_meeting(&self, id: &MeetingId) -> Result<Option<MeetingRecord>, DomainError>;

    /// Merge `patch` into the record and return the updated record.
    ///
    /// # Errors
    /// `DomainError::MeetingNotFound` if no record has this id.
    async fn update_meeting(
        &self,
        id: &MeetingId,
        patch: MeetingPatch,
    ) -> Result<MeetingRecord, DomainError>;
}

/// Contact lookups used for pre-meeting preparation.
#[async_trait::async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>, DomainError>;

    /// Meetings with this contact that started before `before`, most recent first,
    /// at most `limit`.
    async fn historical_meetings(
        &self,
        contact_id: &ContactId,
        before: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<MeetingRecord>, DomainError>;
}

/// Black-box text generation. May fail transiently.
#[async_trait::async_trait]
pub trait InsightService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceFailure>;
}
