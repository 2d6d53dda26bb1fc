//! Infrastructure adapters. Implement outbound ports.
//!
//! Meeting store, insight services, terminal UI. Map errors to DomainError.

pub mod ai;
pub mod persistence;
pub mod ui;
