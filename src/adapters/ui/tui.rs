//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Main menu drives slot finding (and booking), transcript analysis, meeting prep
//! and cancellation. Results are printed as pretty JSON.

use crate::adapters::persistence::InMemoryMeetingStore;
use crate::domain::{DomainError, EnrichmentTask, MeetingRecord, OwnerId, TimeSlot, User};
use crate::ports::InputPort;
use crate::usecases::{AvailabilityPlanner, InsightAggregator, PrepService};
use async_trait::async_trait;
use chrono::NaiveDate;
use inquire::error::InquireError;
use inquire::{Confirm, CustomType, MultiSelect, Select, Text};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

const MENU_SLOTS: &str = "Find available slots";
const MENU_ANALYZE: &str = "Analyze transcript";
const MENU_PREP: &str = "Prepare meeting";
const MENU_CANCEL: &str = "Cancel meeting";
const MENU_QUIT: &str = "Quit";

struct UserChoice(User);

impl fmt::Display for UserChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.name, self.0.id)
    }
}

struct MeetingChoice(MeetingRecord);

impl fmt::Display for MeetingChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.0.start.format("%Y-%m-%d %H:%M"),
            self.0.id,
            self.0.title
        )
    }
}

fn input_error(e: InquireError) -> DomainError {
    DomainError::Input(e.to_string())
}

fn is_abort(e: &InquireError) -> bool {
    matches!(
        e,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

/// One record per owner for a booked slot.
fn booking_records(owners: &[OwnerId], slot: TimeSlot, title: &str) -> Vec<MeetingRecord> {
    owners
        .iter()
        .map(|owner| {
            let id = format!("meeting_{}_{}", owner, slot.start.format("%Y%m%d%H%M"));
            MeetingRecord::new(id.as_str().into(), owner.clone(), title, slot.start)
                .with_end(slot.end)
        })
        .collect()
}

/// Line shown for a failed action. Caller errors read as a rejected request.
fn describe_error(e: &DomainError) -> String {
    if e.is_caller_error() {
        format!("Invalid request: {}", e)
    } else {
        format!("Error: {}", e)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DomainError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| DomainError::Input(format!("render result: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    store: Arc<InMemoryMeetingStore>,
    planner: Arc<AvailabilityPlanner>,
    aggregator: Arc<InsightAggregator>,
    prep: Arc<PrepService>,
}

impl TuiInputPort {
    pub fn new(
        store: Arc<InMemoryMeetingStore>,
        planner: Arc<AvailabilityPlanner>,
        aggregator: Arc<InsightAggregator>,
        prep: Arc<PrepService>,
    ) -> Self {
        Self {
            store,
            planner,
            aggregator,
            prep,
        }
    }

    async fn find_slots(&self) -> Result<(), DomainError> {
        let users: Vec<UserChoice> = self.store.users().await.into_iter().map(UserChoice).collect();
        let selected = MultiSelect::new("Whose calendars?", users)
            .prompt()
            .map_err(input_error)?;
        let owners: Vec<OwnerId> = selected.into_iter().map(|u| u.0.id).collect();

        let date = CustomType::<NaiveDate>::new("Date (YYYY-MM-DD):")
            .with_error_message("Please enter a date like 2025-12-01")
            .prompt()
            .map_err(input_error)?;
        let duration = CustomType::<i64>::new("Duration in minutes:")
            .with_default(60)
            .prompt()
            .map_err(input_error)?;

        let slots = self
            .planner
            .find_available_slots(&owners, date, duration)
            .await?;
        print_json(&slots)?;
        if slots.is_empty() {
            return Ok(());
        }

        let Some(slot) = Select::new("Book a slot?", slots)
            .prompt_skippable()
            .map_err(input_error)?
        else {
            return Ok(());
        };
        let title = Text::new("Title:")
            .with_default("Meeting")
            .prompt()
            .map_err(input_error)?;
        for record in booking_records(&owners, slot, &title) {
            info!(meeting_id = %record.id, slot = %slot, "meeting booked");
            self.store.insert_meeting(record).await;
        }
        println!("Booked {}", slot);
        Ok(())
    }

    async fn cancel(&self) -> Result<(), DomainError> {
        let meetings: Vec<MeetingChoice> = self
            .store
            .all_meetings()
            .await
            .into_iter()
            .map(MeetingChoice)
            .collect();
        if meetings.is_empty() {
            println!("No meetings on record.");
            return Ok(());
        }
        let meeting = Select::new("Meeting to cancel:", meetings)
            .prompt()
            .map_err(input_error)?;
        let confirmed = Confirm::new(&format!("Cancel {}?", meeting))
            .with_default(false)
            .prompt()
            .map_err(input_error)?;
        if confirmed && self.store.delete_meeting(&meeting.0.id).await.is_some() {
            info!(meeting_id = %meeting.0.id, "meeting cancelled");
            println!("Cancelled {}", meeting.0.id);
        }
        Ok(())
    }

    async fn analyze(&self) -> Result<(), DomainError> {
        let meetings: Vec<MeetingChoice> = self
            .store
            .all_meetings()
            .await
            .into_iter()
            .map(MeetingChoice)
            .collect();
        if meetings.is_empty() {
            println!("No meetings on record.");
            return Ok(());
        }
        let meeting = Select::new("Meeting:", meetings)
            .prompt()
            .map_err(input_error)?;
        let transcript = Text::new("Transcript:")
            .with_initial_value(meeting.0.transcript.as_deref().unwrap_or_default())
            .prompt()
            .map_err(input_error)?;

        let report = self
            .aggregator
            .analyze_transcript(&meeting.0.id, &transcript, &EnrichmentTask::ALL)
            .await?;
        print_json(&report)
    }

    async fn prepare(&self) -> Result<(), DomainError> {
        let meetings: Vec<MeetingChoice> = self
            .store
            .all_meetings()
            .await
            .into_iter()
            .filter(|m| m.contact_id.is_some())
            .map(MeetingChoice)
            .collect();
        if meetings.is_empty() {
            println!("No meetings with an external contact.");
            return Ok(());
        }
        let meeting = Select::new("Meeting:", meetings)
            .prompt()
            .map_err(input_error)?;

        let updated = self.prep.prepare_meeting(&meeting.0.id).await?;
        print_json(&updated.prep)
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let choice = match Select::new(
                "What would you like to do?",
                vec![MENU_SLOTS, MENU_ANALYZE, MENU_PREP, MENU_CANCEL, MENU_QUIT],
            )
            .prompt()
            {
                Ok(choice) => choice,
                Err(e) if is_abort(&e) => return Ok(()),
                Err(e) => return Err(input_error(e)),
            };

            let result = match choice {
                MENU_SLOTS => self.find_slots().await,
                MENU_ANALYZE => self.analyze().await,
                MENU_PREP => self.prepare().await,
                MENU_CANCEL => self.cancel().await,
                _ => return Ok(()),
            };

            match result {
                Ok(()) => {}
                Err(DomainError::Input(msg)) => warn!(error = %msg, "prompt aborted"),
                Err(e) => {
                    warn!(error = %e, caller_error = e.is_caller_error(), "action failed");
                    println!("{}", describe_error(&e));
                }
            }
        }
    }
}
