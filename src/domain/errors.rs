//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use chrono::NaiveDateTime;
use thiserror::Error;

use super::entities::{ContactId, MeetingId, OwnerId};

/// Failure of a single upstream insight call.
///
/// `Transient` and `Malformed` are retried; `Permanent` is not.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceFailure {
    /// Upstream flakiness (rate limit, timeout, unavailable).
    #[error("transient upstream failure: {0}")]
    Transient(String),

    /// Response arrived but did not parse into the expected shape.
    /// Indistinguishable from flakiness for the caller, so it is retried.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// Upstream explicitly rejected the request.
    #[error("upstream rejected the request: {0}")]
    Permanent(String),
}

impl ServiceFailure {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ServiceFailure::Permanent(_))
    }
}

/// Terminal failure of a retried call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: ServiceFailure,
    },

    /// Non-retryable failure; surfaced on the attempt that produced it.
    #[error("attempt {attempt} failed permanently: {failure}")]
    Rejected {
        attempt: u32,
        #[source]
        failure: ServiceFailure,
    },

    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl RetryError {
    /// Number of attempts that were started before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::RetriesExhausted { attempts, .. } => *attempts,
            RetryError::Rejected { attempt, .. } => *attempt,
            RetryError::Cancelled { attempts } => *attempts,
        }
    }
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("owner set is empty")]
    EmptyOwnerSet,

    #[error("unknown owner: {0}")]
    UnknownOwner(OwnerId),

    #[error("invalid interval for {owner}: [{start}, {end})")]
    InvalidInterval {
        owner: OwnerId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("cannot merge intervals of different owners ({first} and {other})")]
    MixedOwners { first: OwnerId, other: OwnerId },

    #[error("duration must be positive, got {0} minutes")]
    InvalidDuration(i64),

    #[error("invalid work hours ({open}, {close})")]
    InvalidWorkHours { open: u32, close: u32 },

    #[error("meeting not found: {0}")]
    MeetingNotFound(MeetingId),

    #[error("transcript is empty")]
    EmptyTranscript,

    #[error("meeting {0} has no external contact")]
    NoExternalContact(MeetingId),

    #[error("contact not found: {0}")]
    ContactNotFound(ContactId),

    #[error("Meeting store error: {0}")]
    Store(String),

    #[error("Insight generation failed: {0}")]
    Insight(#[from] RetryError),

    #[error("Input error: {0}")]
    Input(String),
}

impl DomainError {
    /// Bad input from the caller; never worth retrying.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DomainError::EmptyOwnerSet
                | DomainError::UnknownOwner(_)
                | DomainError::InvalidInterval { .. }
                | DomainError::MixedOwners { .. }
                | DomainError::InvalidDuration(_)
                | DomainError::InvalidWorkHours { .. }
                | DomainError::MeetingNotFound(_)
                | DomainError::EmptyTranscript
                | DomainError::NoExternalContact(_)
                | DomainError::ContactNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_permanent_is_final() {
        assert!(ServiceFailure::Transient("timeout".into()).is_retryable());
        assert!(ServiceFailure::Malformed("not json".into()).is_retryable());
        assert!(!ServiceFailure::Permanent("bad request".into()).is_retryable());
    }

    #[test]
    fn test_exhausted_keeps_last_failure() {
        let err = RetryError::RetriesExhausted {
            attempts: 3,
            last: ServiceFailure::Transient("rate limited".into()),
        };
        assert_eq!(err.attempts(), 3);
        assert!(err.to_string().contains("rate limited"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_caller_errors() {
        assert!(DomainError::EmptyTranscript.is_caller_error());
        assert!(DomainError::UnknownOwner("nobody".into()).is_caller_error());
        assert!(!DomainError::Store("disk".into()).is_caller_error());
        assert!(!DomainError::Insight(RetryError::Cancelled { attempts: 1 }).is_caller_error());
    }
}
