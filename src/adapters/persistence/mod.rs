//! Persistence adapters. Implement MeetingStore and ContactDirectory.

pub mod memory_store;

pub use memory_store::{InMemoryMeetingStore, SeedData};
