//! Cross-cutting pieces: configuration and the retry/cancellation primitives.

pub mod config;
pub mod retry;

pub use retry::{CancelHandle, Cancellation, RetryEvent, RetryObserver, RetryPolicy, RetryingCaller};
