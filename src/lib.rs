//! meeting-intel: availability planning and fault-tolerant transcript enrichment
//! with Hexagonal Architecture.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
