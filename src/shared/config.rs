//! Application configuration. Planning defaults, retry policy, AI credentials.

use serde::Deserialize;
use std::time::Duration;

use crate::domain::WorkHours;
use crate::shared::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::usecases::{ExecutionMode, PlannerConfig};

/// Canonical busy length for meetings recorded without an end time.
pub const DEFAULT_MEETING_MINUTES: i64 = 60;
/// Candidate slots start every this many minutes from the opening hour.
pub const DEFAULT_SLOT_STEP_MINUTES: i64 = 30;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// First bookable hour. Read from MEETING_INTEL_WORK_OPEN_HOUR.
    #[serde(default)]
    pub work_open_hour: Option<u32>,

    /// Hour at which the last slot must have ended. Read from MEETING_INTEL_WORK_CLOSE_HOUR.
    #[serde(default)]
    pub work_close_hour: Option<u32>,

    #[serde(default)]
    pub slot_step_minutes: Option<i64>,

    #[serde(default)]
    pub default_meeting_minutes: Option<i64>,

    #[serde(default)]
    pub retry_max_attempts: Option<u32>,

    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,

    /// Run enrichment tasks concurrently (default) or one after another.
    #[serde(default)]
    pub concurrent_tasks: Option<bool>,

    /// JSON seed for the in-memory store. Embedded fixture when unset.
    #[serde(default)]
    pub seed_path: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Insight Service Configuration
    // ─────────────────────────────────────────────────────────────────────────
    /// AI API key (e.g., OpenAI). Read from MEETING_INTEL_AI_API_KEY.
    #[serde(default)]
    pub ai_api_key: Option<String>,

    /// AI API URL. Defaults to OpenAI. Read from MEETING_INTEL_AI_API_URL.
    #[serde(default)]
    pub ai_api_url: Option<String>,

    /// AI model name. Defaults to "gpt-4o-mini". Read from MEETING_INTEL_AI_MODEL.
    #[serde(default)]
    pub ai_model: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("MEETING_INTEL").try_parsing(true));
        if let Ok(path) = std::env::var("MEETING_INTEL_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn work_hours_or_default(&self) -> WorkHours {
        let default = WorkHours::default();
        WorkHours::new(
            self.work_open_hour.unwrap_or(default.open),
            self.work_close_hour.unwrap_or(default.close),
        )
    }

    /// Returns the slot step in minutes. Non-positive values fall back to the default.
    pub fn slot_step_minutes_or_default(&self) -> i64 {
        self.slot_step_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_SLOT_STEP_MINUTES)
    }

    pub fn default_meeting_minutes_or_default(&self) -> i64 {
        self.default_meeting_minutes
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_MEETING_MINUTES)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            Duration::from_millis(self.retry_base_delay_ms.unwrap_or(DEFAULT_BASE_DELAY_MS)),
        )
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        if self.concurrent_tasks.unwrap_or(true) {
            ExecutionMode::Concurrent
        } else {
            ExecutionMode::Sequential
        }
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig::new(
            self.slot_step_minutes_or_default(),
            self.default_meeting_minutes_or_default(),
            self.work_hours_or_default(),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // AI Configuration Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the AI API key if configured. Reads from config or MEETING_INTEL_AI_API_KEY env.
    pub fn ai_api_key(&self) -> Option<String> {
        self.ai_api_key
            .clone()
            .or_else(|| std::env::var("MEETING_INTEL_AI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }

    /// Returns the AI API URL. Defaults to OpenAI chat completions endpoint.
    pub fn ai_api_url_or_default(&self) -> String {
        self.ai_api_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string())
    }

    /// Returns the AI model name. Defaults to "gpt-4o-mini".
    pub fn ai_model_or_default(&self) -> String {
        self.ai_model
            .clone()
            .unwrap_or_else(|| "gpt-4o-mini".to_string())
    }

    /// Returns true if AI is configured (API key present).
    pub fn is_ai_configured(&self) -> bool {
        self.ai_api_key().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.work_hours_or_default(), WorkHours::new(9, 17));
        assert_eq!(cfg.slot_step_minutes_or_default(), 30);
        assert_eq!(cfg.default_meeting_minutes_or_default(), 60);
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        assert_eq!(cfg.execution_mode(), ExecutionMode::Concurrent);
    }

    #[test]
    fn test_overrides() {
        let cfg = AppConfig {
            work_open_hour: Some(8),
            slot_step_minutes: Some(15),
            retry_max_attempts: Some(5),
            retry_base_delay_ms: Some(10),
            concurrent_tasks: Some(false),
            ..Default::default()
        };
        assert_eq!(cfg.work_hours_or_default(), WorkHours::new(8, 17));
        assert_eq!(cfg.slot_step_minutes_or_default(), 15);
        assert_eq!(
            cfg.retry_policy(),
            RetryPolicy::new(5, Duration::from_millis(10))
        );
        assert_eq!(cfg.execution_mode(), ExecutionMode::Sequential);
    }

    #[test]
    fn test_non_positive_step_falls_back() {
        let cfg = AppConfig {
            slot_step_minutes: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.slot_step_minutes_or_default(), 30);
    }
}
