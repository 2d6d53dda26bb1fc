//! Domain entities. Pure data structures for the core business.
//!
//! No store/HTTP types here; adapters map their records into these.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::insights::{MeetingInsights, MeetingPrep};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Calendar owner (a user whose busy time counts during planning).
    OwnerId
);
string_id!(MeetingId);
string_id!(ContactId);

/// A user known to the meeting store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: OwnerId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// External person a meeting can be held with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub relationship_start: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A meeting as held by the store.
///
/// `end` may be absent: not every source records when a meeting finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: MeetingId,
    pub owner_id: OwnerId,
    #[serde(default)]
    pub contact_id: Option<ContactId>,
    pub title: String,
    pub start: NaiveDateTime,
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub insights: Option<MeetingInsights>,
    #[serde(default)]
    pub prep: Option<MeetingPrep>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl MeetingRecord {
    pub fn new(
        id: MeetingId,
        owner_id: OwnerId,
        title: impl Into<String>,
        start: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            owner_id,
            contact_id: None,
            title: title.into(),
            start,
            end: None,
            transcript: None,
            summary: None,
            action_items: Vec::new(),
            insights: None,
            prep: None,
            created_at: None,
        }
    }

    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_contact(mut self, contact_id: ContactId) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Busy interval this meeting occupies; `default_length` stands in for a missing end.
    pub fn busy_interval(&self, default_length: TimeDelta) -> BusyInterval {
        BusyInterval {
            start: self.start,
            end: self.end.unwrap_or(self.start + default_length),
            owner: self.owner_id.clone(),
        }
    }
}

/// Field patch for [`MeetingRecord`]. `None` leaves the field untouched.
///
/// Nullable record fields use `Option<Option<_>>` so that "absent from the
/// patch" and "clear the field" stay distinct.
#[derive(Debug, Clone, Default)]
pub struct MeetingPatch {
    pub title: Option<String>,
    pub contact_id: Option<Option<ContactId>>,
    pub end: Option<Option<NaiveDateTime>>,
    pub transcript: Option<String>,
    pub summary: Option<Option<String>>,
    pub insights: Option<MeetingInsights>,
    pub prep: Option<MeetingPrep>,
}

impl MeetingPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.contact_id.is_none()
            && self.end.is_none()
            && self.transcript.is_none()
            && self.summary.is_none()
            && self.insights.is_none()
            && self.prep.is_none()
    }

    /// Last-writer-wins merge: replaces only the fields this patch carries.
    pub fn apply(self, record: &mut MeetingRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(contact_id) = self.contact_id {
            record.contact_id = contact_id;
        }
        if let Some(end) = self.end {
            record.end = end;
        }
        if let Some(transcript) = self.transcript {
            record.transcript = Some(transcript);
        }
        if let Some(summary) = self.summary {
            record.summary = summary;
        }
        if let Some(insights) = self.insights {
            record.insights = Some(insights);
        }
        if let Some(prep) = self.prep {
            record.prep = Some(prep);
        }
    }
}

/// Half-open busy range `[start, end)` of one owner.
///
/// Transient projection of a meeting; only lives for one planning call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub owner: OwnerId,
}

impl BusyInterval {
    pub fn new(owner: OwnerId, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end, owner }
    }

    /// True when `[start, end)` and this interval share at least one instant.
    pub fn intersects(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && start < self.end
    }
}

/// An offered open range. `end - start` is always the requested duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSlot {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.start.format("%Y-%m-%d"),
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Work-hours window in whole hours, `open < close <= 24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkHours {
    pub open: u32,
    pub close: u32,
}

impl WorkHours {
    pub const fn new(open: u32, close: u32) -> Self {
        Self { open, close }
    }

    pub fn is_valid(&self) -> bool {
        self.open < self.close && self.close <= 24
    }

    pub fn opens_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(chrono::NaiveTime::MIN) + TimeDelta::hours(i64::from(self.open))
    }

    pub fn closes_at(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(chrono::NaiveTime::MIN) + TimeDelta::hours(i64::from(self.close))
    }
}

impl Default for WorkHours {
    fn default() -> Self {
        Self::new(9, 17)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_busy_interval_defaults_to_one_hour() {
        let meeting = MeetingRecord::new("m1".into(), "user_1".into(), "Standup", at(10, 0));
        let busy = meeting.busy_interval(TimeDelta::hours(1));
        assert_eq!(busy.start, at(10, 0));
        assert_eq!(busy.end, at(11, 0));
    }

    #[test]
    fn test_busy_interval_uses_explicit_end() {
        let meeting = MeetingRecord::new("m1".into(), "user_1".into(), "Review", at(10, 0))
            .with_end(at(10, 30));
        assert_eq!(meeting.busy_interval(TimeDelta::hours(1)).end, at(10, 30));
    }

    #[test]
    fn test_patch_replaces_only_supplied_fields() {
        let mut meeting = MeetingRecord::new("m1".into(), "user_1".into(), "Review", at(10, 0))
            .with_contact("contact_1".into());
        meeting.summary = Some("old".to_string());

        MeetingPatch {
            transcript: Some("Sarah: hi".to_string()),
            ..Default::default()
        }
        .apply(&mut meeting);

        assert_eq!(meeting.transcript.as_deref(), Some("Sarah: hi"));
        assert_eq!(meeting.summary.as_deref(), Some("old"));
        assert_eq!(meeting.contact_id, Some(ContactId::from("contact_1")));
    }

    #[test]
    fn test_patch_distinguishes_clear_from_absent() {
        let mut meeting = MeetingRecord::new("m1".into(), "user_1".into(), "Review", at(10, 0))
            .with_contact("contact_1".into());

        MeetingPatch {
            contact_id: Some(None),
            ..Default::default()
        }
        .apply(&mut meeting);

        assert!(meeting.contact_id.is_none());
    }

    #[test]
    fn test_work_hours_bounds() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let hours = WorkHours::new(0, 24);
        assert!(hours.is_valid());
        assert_eq!(hours.closes_at(date) - hours.opens_at(date), TimeDelta::hours(24));
        assert!(!WorkHours::new(17, 9).is_valid());
        assert!(!WorkHours::new(9, 25).is_valid());
    }
}
