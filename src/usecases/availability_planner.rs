//! Availability planning: open slots that are free for every requested owner.
//!
//! - Collects each owner's meetings on the date via MeetingStore (concurrently)
//! - Merges them per owner into an IntervalSet
//! - Walks candidate starts from the opening hour at a fixed step

use crate::domain::{DomainError, IntervalSet, OwnerId, TimeSlot, WorkHours};
use crate::ports::MeetingStore;
use crate::shared::config::{DEFAULT_MEETING_MINUTES, DEFAULT_SLOT_STEP_MINUTES};
use chrono::{NaiveDate, TimeDelta};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Planning knobs. `step` and `default_meeting_length` are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Distance between candidate start times.
    pub step: TimeDelta,
    /// Busy length assumed for meetings without an end time.
    pub default_meeting_length: TimeDelta,
    pub work_hours: WorkHours,
}

impl PlannerConfig {
    pub fn new(step_minutes: i64, default_meeting_minutes: i64, work_hours: WorkHours) -> Self {
        Self {
            step: TimeDelta::minutes(step_minutes.clamp(1, 24 * 60)),
            default_meeting_length: TimeDelta::minutes(default_meeting_minutes.clamp(1, 24 * 60)),
            work_hours,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_SLOT_STEP_MINUTES,
            DEFAULT_MEETING_MINUTES,
            WorkHours::default(),
        )
    }
}

pub struct AvailabilityPlanner {
    store: Arc<dyn MeetingStore>,
    config: PlannerConfig,
}

impl AvailabilityPlanner {
    pub fn new(store: Arc<dyn MeetingStore>, config: PlannerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> PlannerConfig {
        self.config
    }

    /// Slots of `duration_minutes` within the configured work hours.
    pub async fn find_available_slots(
        &self,
        owner_ids: &[OwnerId],
        date: NaiveDate,
        duration_minutes: i64,
    ) -> Result<Vec<TimeSlot>, DomainError> {
        self.find_available_slots_within(owner_ids, date, duration_minutes, self.config.work_hours)
            .await
    }

    /// Every `[start, start + duration)` inside `work_hours` on `date` that is free for
    /// all owners, in ascending order.
    ///
    /// Slots may overlap each other when the step is shorter than the duration.
    /// Finding nothing is an empty vector, never an error.
    pub async fn find_available_slots_within(
        &self,
        owner_ids: &[OwnerId],
        date: NaiveDate,
        duration_minutes: i64,
        work_hours: WorkHours,
    ) -> Result<Vec<TimeSlot>, DomainError> {
        if owner_ids.is_empty() {
            return Err(DomainError::EmptyOwnerSet);
        }
        let duration = positive_minutes(duration_minutes)?;
        if !work_hours.is_valid() {
            return Err(DomainError::InvalidWorkHours {
                open: work_hours.open,
                close: work_hours.close,
            });
        }

        let mut owners: Vec<OwnerId> = Vec::with_capacity(owner_ids.len());
        for id in owner_ids {
            if !owners.contains(id) {
                owners.push(id.clone());
            }
        }
        for id in &owners {
            if !self.store.owner_exists(id).await? {
                return Err(DomainError::UnknownOwner(id.clone()));
            }
        }

        let open = work_hours.opens_at(date);
        let close = work_hours.closes_at(date);
        if duration > close - open {
            debug!(duration_minutes, "duration exceeds work hours");
            return Ok(Vec::new());
        }

        let busy = self.collect_busy(&owners, date).await?;

        let mut slots = Vec::new();
        let mut start = open;
        while let Some(end) = start
            .checked_add_signed(duration)
            .filter(|end| *end <= close)
        {
            if busy.iter().all(|set| set.is_free(start, end)) {
                slots.push(TimeSlot { start, end });
            }
            start += self.config.step;
        }

        info!(
            owners = owners.len(),
            date = %date,
            duration_minutes,
            slots = slots.len(),
            "availability computed"
        );
        Ok(slots)
    }

    /// One merged busy set per owner. Collection runs concurrently; order is irrelevant
    /// because a candidate must be free in every set.
    async fn collect_busy(
        &self,
        owners: &[OwnerId],
        date: NaiveDate,
    ) -> Result<Vec<IntervalSet>, DomainError> {
        let default_length = self.config.default_meeting_length;
        let mut tasks = JoinSet::new();
        for owner in owners {
            let store = Arc::clone(&self.store);
            let owner = owner.clone();
            tasks.spawn(async move {
                let meetings = store.list_meetings(&owner, date).await?;
                let set = IntervalSet::from_intervals(
                    meetings
                        .iter()
                        .filter(|m| m.date() == date)
                        .map(|m| m.busy_interval(default_length)),
                )?;
                debug!(owner = %owner, meetings = meetings.len(), blocks = set.len(), "busy time merged");
                Ok::<_, DomainError>(set)
            });
        }

        let mut sets = Vec::with_capacity(owners.len());
        while let Some(joined) = tasks.join_next().await {
            let set = joined
                .map_err(|e| DomainError::Store(format!("busy-time collection aborted: {}", e)))??;
            sets.push(set);
        }
        Ok(sets)
    }
}

fn positive_minutes(minutes: i64) -> Result<TimeDelta, DomainError> {
    if minutes <= 0 {
        return Err(DomainError::InvalidDuration(minutes));
    }
    TimeDelta::try_minutes(minutes).ok_or(DomainError::InvalidDuration(minutes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::InMemoryMeetingStore;
    use crate::domain::{MeetingRecord, User};
    use chrono::NaiveDateTime;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        date().and_hms_opt(h, m, 0).unwrap()
    }

    fn user(id: &str) -> User {
        User {
            id: id.into(),
            name: id.to_string(),
            email: format!("{}@example.com", id),
            role: None,
        }
    }

    async fn store_with_users() -> Arc<InMemoryMeetingStore> {
        let store = InMemoryMeetingStore::new();
        store.insert_user(user("user_1")).await;
        store.insert_user(user("user_2")).await;
        Arc::new(store)
    }

    async fn book(store: &InMemoryMeetingStore, id: &str, owner: &str, start: NaiveDateTime, end: Option<NaiveDateTime>) {
        let mut meeting = MeetingRecord::new(id.into(), owner.into(), "Busy", start);
        meeting.end = end;
        store.insert_meeting(meeting).await;
    }

    fn planner(store: Arc<InMemoryMeetingStore>) -> AvailabilityPlanner {
        AvailabilityPlanner::new(store, PlannerConfig::default())
    }

    #[tokio::test]
    async fn test_free_owner_gets_full_window() {
        let store = store_with_users().await;
        let slots = planner(store)
            .find_available_slots(&["user_2".into()], date(), 60)
            .await
            .unwrap();

        // 09:00, 09:30, ..., 16:00
        assert_eq!(slots.len(), 15);
        assert_eq!(slots.first().unwrap().start, at(9, 0));
        assert_eq!(slots.last().unwrap().end, at(17, 0));
        for pair in slots.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, TimeDelta::minutes(30));
        }
    }

    #[tokio::test]
    async fn test_busy_hour_is_skipped() {
        let store = store_with_users().await;
        book(&store, "m1", "user_1", at(10, 0), Some(at(11, 0))).await;

        let slots = planner(store)
            .find_available_slots(&["user_1".into()], date(), 60)
            .await
            .unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();

        assert!(starts.contains(&at(9, 0)));
        assert!(!starts.contains(&at(9, 30)));
        assert!(!starts.contains(&at(10, 0)));
        assert!(!starts.contains(&at(10, 30)));
        assert!(starts.contains(&at(11, 0)));
    }

    #[tokio::test]
    async fn test_missing_end_blocks_one_hour() {
        let store = store_with_users().await;
        book(&store, "m1", "user_1", at(13, 0), None).await;

        let slots = planner(store)
            .find_available_slots(&["user_1".into()], date(), 30)
            .await
            .unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();

        assert!(starts.contains(&at(12, 30)));
        assert!(!starts.contains(&at(13, 0)));
        assert!(!starts.contains(&at(13, 30)));
        assert!(starts.contains(&at(14, 0)));
    }

    #[tokio::test]
    async fn test_slots_avoid_every_owner() {
        let store = store_with_users().await;
        book(&store, "m1", "user_1", at(9, 0), Some(at(12, 0))).await;
        book(&store, "m2", "user_2", at(13, 0), Some(at(15, 0))).await;

        let slots = planner(store)
            .find_available_slots(&["user_1".into(), "user_2".into()], date(), 60)
            .await
            .unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();

        assert_eq!(starts, vec![at(12, 0), at(15, 0), at(15, 30), at(16, 0)]);
    }

    #[tokio::test]
    async fn test_slots_never_intersect_busy_time() {
        let store = store_with_users().await;
        let busy = [
            ("m1", "user_1", at(9, 15), Some(at(9, 45))),
            ("m2", "user_1", at(11, 0), None),
            ("m3", "user_1", at(11, 30), Some(at(12, 10))),
            ("m4", "user_2", at(14, 50), Some(at(15, 20))),
        ];
        for (id, owner, start, end) in busy {
            book(&store, id, owner, start, end).await;
        }
        let owners: Vec<OwnerId> = vec!["user_1".into(), "user_2".into()];
        let default_length = TimeDelta::hours(1);

        for duration in [15, 30, 45, 60, 90, 120] {
            for step in [15, 30, 60] {
                let planner = AvailabilityPlanner::new(
                    store.clone(),
                    PlannerConfig::new(step, 60, WorkHours::default()),
                );
                let slots = planner
                    .find_available_slots(&owners, date(), duration)
                    .await
                    .unwrap();
                for slot in &slots {
                    assert_eq!(slot.duration(), TimeDelta::minutes(duration));
                    for (_, _, start, end) in busy {
                        let end = end.unwrap_or(start + default_length);
                        assert!(
                            !(slot.start < end && start < slot.end),
                            "slot {} overlaps busy [{}, {})",
                            slot,
                            start,
                            end
                        );
                    }
                }
                for pair in slots.windows(2) {
                    assert!(pair[0].start < pair[1].start);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_other_dates_do_not_block() {
        let store = store_with_users().await;
        let other_day = NaiveDate::from_ymd_opt(2025, 12, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        book(&store, "m1", "user_1", other_day, Some(other_day + TimeDelta::hours(7))).await;

        let slots = planner(store)
            .find_available_slots(&["user_1".into()], date(), 60)
            .await
            .unwrap();
        assert_eq!(slots.len(), 15);
    }

    #[tokio::test]
    async fn test_hourly_step_two_hour_meeting() {
        let store = store_with_users().await;
        book(&store, "m1", "user_1", at(10, 0), Some(at(12, 0))).await;
        let planner = AvailabilityPlanner::new(store, PlannerConfig::new(60, 60, WorkHours::default()));

        let slots = planner
            .find_available_slots(&["user_1".into()], date(), 120)
            .await
            .unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();

        assert_eq!(starts, vec![at(12, 0), at(13, 0), at(14, 0), at(15, 0)]);
    }

    #[tokio::test]
    async fn test_custom_work_hours() {
        let store = store_with_users().await;
        let slots = planner(store)
            .find_available_slots_within(&["user_2".into()], date(), 60, WorkHours::new(8, 10))
            .await
            .unwrap();
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![at(8, 0), at(8, 30), at(9, 0)]);
    }

    #[tokio::test]
    async fn test_duration_longer_than_window_is_empty() {
        let store = store_with_users().await;
        let slots = planner(store)
            .find_available_slots(&["user_2".into()], date(), 9 * 60)
            .await
            .unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn test_huge_duration_is_empty_not_overflow() {
        let store = store_with_users().await;
        let planner = planner(store);

        for minutes in [1_000_000_000_000, i64::MAX / 60_000] {
            let slots = planner
                .find_available_slots(&["user_2".into()], date(), minutes)
                .await
                .unwrap();
            assert!(slots.is_empty());
        }

        let err = planner
            .find_available_slots(&["nobody".into()], date(), i64::MAX / 60_000)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownOwner(_)));
    }

    #[tokio::test]
    async fn test_full_day_window_with_exact_duration() {
        let store = store_with_users().await;
        let slots = planner(store)
            .find_available_slots_within(&["user_2".into()], date(), 24 * 60, WorkHours::new(0, 24))
            .await
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].duration(), TimeDelta::hours(24));
    }

    #[tokio::test]
    async fn test_fully_booked_day_is_empty() {
        let store = store_with_users().await;
        book(&store, "m1", "user_1", at(8, 0), Some(at(18, 0))).await;
        let slots = planner(store)
            .find_available_slots(&["user_1".into()], date(), 30)
            .await
            .unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn test_empty_owner_set() {
        let store = store_with_users().await;
        let err = planner(store)
            .find_available_slots(&[], date(), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::EmptyOwnerSet));
    }

    #[tokio::test]
    async fn test_unknown_owner() {
        let store = store_with_users().await;
        let err = planner(store)
            .find_available_slots(&["user_1".into(), "no_such_user".into()], date(), 60)
            .await
            .unwrap_err();
        match err {
            DomainError::UnknownOwner(id) => assert_eq!(id.as_str(), "no_such_user"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_duration_and_hours() {
        let store = store_with_users().await;
        let planner = planner(store);
        let owners: Vec<OwnerId> = vec!["user_1".into()];

        assert!(matches!(
            planner.find_available_slots(&owners, date(), 0).await,
            Err(DomainError::InvalidDuration(0))
        ));
        assert!(matches!(
            planner
                .find_available_slots_within(&owners, date(), 60, WorkHours::new(17, 9))
                .await,
            Err(DomainError::InvalidWorkHours { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_meeting_aborts_planning() {
        let store = store_with_users().await;
        book(&store, "m1", "user_1", at(11, 0), Some(at(10, 0))).await;
        let err = planner(store)
            .find_available_slots(&["user_1".into()], date(), 60)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInterval { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_owners_are_collapsed() {
        let store = store_with_users().await;
        book(&store, "m1", "user_1", at(9, 0), Some(at(16, 0))).await;
        let slots = planner(store)
            .find_available_slots(&["user_1".into(), "user_1".into()], date(), 60)
            .await
            .unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, at(16, 0));
    }
}
