//! Core domain layer. No external I/O dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod insights;
pub mod intervals;

pub use entities::{
    BusyInterval, Contact, ContactId, MeetingId, MeetingPatch, MeetingRecord, OwnerId, TimeSlot,
    User, WorkHours,
};
pub use errors::{DomainError, RetryError, ServiceFailure};
pub use insights::{
    ActionItem, AnalysisOutcome, AnalysisReport, EnrichmentTask, InsightError, InsightErrorKind,
    InsightPayload, InsightResult, KeyTopics, MeetingInsights, MeetingPrep, Sentiment, TaskState,
};
pub use intervals::IntervalSet;
