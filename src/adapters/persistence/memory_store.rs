//! Implements MeetingStore and ContactDirectory in memory.
//!
//! Seeded from a JSON fixture (embedded, or read from disk).

use crate::domain::{
    Contact, ContactId, DomainError, MeetingId, MeetingPatch, MeetingRecord, OwnerId, User,
};
use crate::ports::{ContactDirectory, MeetingStore};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

const EMBEDDED_SEED: &str = include_str!("fixtures/seed.json");

/// Seed document: users, contacts and meetings.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub meetings: Vec<MeetingRecord>,
}

/// In-memory meeting store.
#[derive(Default)]
pub struct InMemoryMeetingStore {
    users: RwLock<HashMap<OwnerId, User>>,
    contacts: RwLock<HashMap<ContactId, Contact>>,
    meetings: RwLock<HashMap<MeetingId, MeetingRecord>>,
}

impl InMemoryMeetingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        Self {
            users: RwLock::new(seed.users.into_iter().map(|u| (u.id.clone(), u)).collect()),
            contacts: RwLock::new(
                seed.contacts
                    .into_iter()
                    .map(|c| (c.id.clone(), c))
                    .collect(),
            ),
            meetings: RwLock::new(
                seed.meetings
                    .into_iter()
                    .map(|m| (m.id.clone(), m))
                    .collect(),
            ),
        }
    }

    pub fn from_seed_json(json: &str) -> Result<Self, DomainError> {
        let seed: SeedData = serde_json::from_str(json)
            .map_err(|e| DomainError::Store(format!("invalid seed: {}", e)))?;
        info!(
            users = seed.users.len(),
            contacts = seed.contacts.len(),
            meetings = seed.meetings.len(),
            "meeting store seeded"
        );
        Ok(Self::from_seed(seed))
    }

    /// Store preloaded with the bundled sample users, contacts and meetings.
    pub fn with_embedded_seed() -> Result<Self, DomainError> {
        Self::from_seed_json(EMBEDDED_SEED)
    }

    pub async fn load_seed_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Store(format!("read seed {}: {}", path.display(), e)))?;
        Self::from_seed_json(&json)
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn insert_contact(&self, contact: Contact) {
        self.contacts.write().await.insert(contact.id.clone(), contact);
    }

    /// Insert or replace a meeting.
    pub async fn insert_meeting(&self, meeting: MeetingRecord) {
        debug!(meeting_id = %meeting.id, owner = %meeting.owner_id, "meeting stored");
        self.meetings.write().await.insert(meeting.id.clone(), meeting);
    }

    pub async fn delete_meeting(&self, id: &MeetingId) -> Option<MeetingRecord> {
        self.meetings.write().await.remove(id)
    }

    /// All users, sorted by id.
    pub async fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    /// All meetings, sorted by start.
    pub async fn all_meetings(&self) -> Vec<MeetingRecord> {
        let mut meetings: Vec<MeetingRecord> =
            self.meetings.read().await.values().cloned().collect();
        meetings.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        meetings
    }
}

#[async_trait::async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn owner_exists(&self, owner_id: &OwnerId) -> Result<bool, DomainError> {
        Ok(self.users.read().await.contains_key(owner_id))
    }

    async fn list_meetings(
        &self,
        owner_id: &OwnerId,
        date: NaiveDate,
    ) -> Result<Vec<MeetingRecord>, DomainError> {
        let meetings = self.meetings.read().await;
        let mut found: Vec<MeetingRecord> = meetings
            .values()
            .filter(|m| &m.owner_id == owner_id && m.date() == date)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(found)
    }

    async fn get_meeting(&self, id: &MeetingId) -> Result<Option<MeetingRecord>, DomainError> {
        Ok(self.meetings.read().await.get(id).cloned())
    }

    async fn update_meeting(
        &self,
        id: &MeetingId,
        patch: MeetingPatch,
    ) -> Result<MeetingRecord, DomainError> {
        let mut meetings = self.meetings.write().await;
        let record = meetings
            .get_mut(id)
            .ok_or_else(|| DomainError::MeetingNotFound(id.clone()))?;
        patch.apply(record);
        debug!(meeting_id = %id, "meeting updated");
        Ok(record.clone())
    }
}

#[async_trait::async_trait]
impl ContactDirectory for InMemoryMeetingStore {
    async fn get_contact(&self, id: &ContactId) -> Result<Option<Contact>, DomainError> {
        Ok(self.contacts.read().await.get(id).cloned())
    }

    async fn historical_meetings(
        &self,
        contact_id: &ContactId,
        before: NaiveDateTime,
        limit: usize,
    ) -> Result<Vec<MeetingRecord>, DomainError> {
        let meetings = self.meetings.read().await;
        let mut past: Vec<MeetingRecord> = meetings
            .values()
            .filter(|m| m.contact_id.as_ref() == Some(contact_id) && m.start < before)
            .cloned()
            .collect();
        past.sort_by(|a, b| b.start.cmp(&a.start));
        past.truncate(limit);
        Ok(past)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_embedded_seed_loads() {
        let store = InMemoryMeetingStore::with_embedded_seed().unwrap();

        assert!(store.owner_exists(&"user_1".into()).await.unwrap());
        assert!(store.owner_exists(&"user_2".into()).await.unwrap());
        assert!(!store.owner_exists(&"user_3".into()).await.unwrap());

        let contact = store.get_contact(&"contact_1".into()).await.unwrap().unwrap();
        assert_eq!(contact.name, "Jennifer Liu");
        assert_eq!(contact.relationship_start, Some(date(2024, 6, 15)));

        let hist = store.get_meeting(&"hist_meeting_2".into()).await.unwrap().unwrap();
        assert_eq!(hist.action_items.len(), 3);
        assert_eq!(hist.prep.unwrap().suggested_topics.len(), 5);
    }

    #[tokio::test]
    async fn test_list_meetings_by_owner_and_date() {
        let store = InMemoryMeetingStore::with_embedded_seed().unwrap();

        let user_1 = store.list_meetings(&"user_1".into(), date(2025, 12, 1)).await.unwrap();
        let ids: Vec<&str> = user_1.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["meeting_1", "meeting_2"]);

        let empty = store.list_meetings(&"user_1".into(), date(2025, 12, 2)).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_historical_meetings_most_recent_first() {
        let store = InMemoryMeetingStore::with_embedded_seed().unwrap();
        let before = date(2025, 12, 1).and_hms_opt(10, 0, 0).unwrap();

        let hist = store
            .historical_meetings(&"contact_1".into(), before, 2)
            .await
            .unwrap();

        let ids: Vec<&str> = hist.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["hist_meeting_3", "hist_meeting_2"]);
    }

    #[tokio::test]
    async fn test_historical_meetings_exclude_later_ones() {
        let store = InMemoryMeetingStore::with_embedded_seed().unwrap();
        let before = date(2025, 7, 18).and_hms_opt(15, 0, 0).unwrap();

        let hist = store
            .historical_meetings(&"contact_1".into(), before, 5)
            .await
            .unwrap();

        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].id.as_str(), "hist_meeting_1");
    }

    #[tokio::test]
    async fn test_update_meeting_merges_patch() {
        let store = InMemoryMeetingStore::with_embedded_seed().unwrap();

        let updated = store
            .update_meeting(
                &"meeting_1".into(),
                MeetingPatch {
                    transcript: Some("Sarah: hello".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.transcript.as_deref(), Some("Sarah: hello"));
        assert_eq!(updated.title, "Implementation Kickoff");

        let err = store
            .update_meeting(&"nope".into(), MeetingPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::MeetingNotFound(_)));
    }

    #[tokio::test]
    async fn test_insert_and_delete() {
        let store = InMemoryMeetingStore::new();
        let start = date(2025, 12, 3).and_hms_opt(9, 0, 0).unwrap();
        store
            .insert_meeting(MeetingRecord::new("m".into(), "user_1".into(), "Sync", start))
            .await;
        assert_eq!(store.all_meetings().await.len(), 1);

        assert!(store.delete_meeting(&"m".into()).await.is_some());
        assert!(store.get_meeting(&"m".into()).await.unwrap().is_none());
    }

    #[test]
    fn test_invalid_seed_is_store_error() {
        let err = InMemoryMeetingStore::from_seed_json("{not json").err().unwrap();
        assert!(matches!(err, DomainError::Store(_)));
    }
}
