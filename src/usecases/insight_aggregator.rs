//! Transcript analysis. Fans out enrichment tasks to the InsightService and
//! assembles a best-effort aggregate.
//!
//! Orchestrates the flow:
//! 1. Reject empty transcripts and unknown meetings before any upstream call
//! 2. Run each task through its own RetryingCaller (concurrently or in sequence)
//! 3. Join, fold results into one report, write it back through MeetingStore

use crate::domain::{
    AnalysisReport, DomainError, EnrichmentTask, InsightError, InsightErrorKind, InsightResult,
    MeetingId, MeetingPatch, TaskState,
};
use crate::ports::{InsightService, MeetingStore};
use crate::shared::retry::{Cancellation, RetryObserver, RetryPolicy, RetryingCaller};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// How independent enrichment tasks are scheduled. Both yield the same report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Concurrent,
    Sequential,
}

pub struct InsightAggregator {
    insight: Arc<dyn InsightService>,
    store: Arc<dyn MeetingStore>,
    policy: RetryPolicy,
    mode: ExecutionMode,
    observer: Option<RetryObserver>,
}

impl InsightAggregator {
    /// Create a new aggregator.
    ///
    /// # Arguments
    /// * `insight` - InsightService implementation (OpenAI, Mock, etc.)
    /// * `store` - MeetingStore the aggregate is written back to
    /// * `policy` - Retry bound and base backoff applied to every task
    pub fn new(
        insight: Arc<dyn InsightService>,
        store: Arc<dyn MeetingStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            insight,
            store,
            policy,
            mode: ExecutionMode::default(),
            observer: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Report every scheduled retry of every task (metrics, tests).
    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run `tasks` (every task when empty) against `transcript` with no deadline.
    pub async fn analyze_transcript(
        &self,
        meeting_id: &MeetingId,
        transcript: &str,
        tasks: &[EnrichmentTask],
    ) -> Result<AnalysisReport, DomainError> {
        self.analyze_transcript_until(meeting_id, transcript, tasks, Cancellation::none())
            .await
    }

    /// Analyze `transcript` for `meeting_id`, running each requested task once.
    /// Duplicates collapse; an empty `tasks` slice means every task.
    ///
    /// Fails only for caller errors (empty transcript, unknown meeting) or a failed
    /// store write. Task failures, including cancellation, land in the report.
    pub async fn analyze_transcript_until(
        &self,
        meeting_id: &MeetingId,
        transcript: &str,
        tasks: &[EnrichmentTask],
        cancel: Cancellation,
    ) -> Result<AnalysisReport, DomainError> {
        if transcript.trim().is_empty() {
            return Err(DomainError::EmptyTranscript);
        }
        if self.store.get_meeting(meeting_id).await?.is_none() {
            return Err(DomainError::MeetingNotFound(meeting_id.clone()));
        }

        let tasks: BTreeSet<EnrichmentTask> = if tasks.is_empty() {
            EnrichmentTask::ALL.into_iter().collect()
        } else {
            tasks.iter().copied().collect()
        };
        let mut caller = RetryingCaller::new(self.policy).with_cancellation(cancel);
        if let Some(observer) = &self.observer {
            caller = caller.with_observer(Arc::clone(observer));
        }
        let shared_transcript: Arc<str> = Arc::from(transcript);

        info!(
            meeting_id = %meeting_id,
            tasks = tasks.len(),
            mode = ?self.mode,
            transcript_len = transcript.len(),
            "analyzing transcript"
        );

        let results = match self.mode {
            ExecutionMode::Concurrent => {
                // Dropping the set aborts every task still in flight.
                let mut set = JoinSet::new();
                for &task in &tasks {
                    set.spawn(run_task(
                        Arc::clone(&self.insight),
                        caller.clone(),
                        task,
                        Arc::clone(&shared_transcript),
                    ));
                }

                let mut results = Vec::with_capacity(tasks.len());
                let mut aborted = None;
                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok(result) => results.push(result),
                        Err(e) => {
                            warn!(error = %e, "enrichment task aborted");
                            aborted = Some(e.to_string());
                        }
                    }
                }
                if let Some(message) = aborted {
                    let finished: BTreeSet<EnrichmentTask> =
                        results.iter().map(InsightResult::task).collect();
                    for &task in tasks.difference(&finished) {
                        results.push(InsightResult::failed(
                            task,
                            InsightError {
                                kind: InsightErrorKind::Aborted,
                                message: message.clone(),
                            },
                            0,
                        ));
                    }
                }
                results
            }
            ExecutionMode::Sequential => {
                let mut results = Vec::with_capacity(tasks.len());
                for &task in &tasks {
                    results.push(
                        run_task(
                            Arc::clone(&self.insight),
                            caller.clone(),
                            task,
                            Arc::clone(&shared_transcript),
                        )
                        .await,
                    );
                }
                results
            }
        };

        let report = AnalysisReport::new(meeting_id.clone(), results);

        let patch = MeetingPatch {
            transcript: Some(transcript.to_string()),
            insights: Some(report.to_meeting_insights()),
            ..Default::default()
        };
        self.store.update_meeting(meeting_id, patch).await?;

        info!(
            meeting_id = %meeting_id,
            outcome = ?report.outcome(),
            failed = report.failed_tasks.len(),
            "analysis complete"
        );
        Ok(report)
    }
}

/// Drive one task from `Pending` to a terminal state.
async fn run_task(
    insight: Arc<dyn InsightService>,
    caller: RetryingCaller,
    task: EnrichmentTask,
    transcript: Arc<str>,
) -> InsightResult {
    let prompt: Arc<str> = Arc::from(task.prompt(&transcript));
    let mut last_attempt = 0u32;
    debug!(task = %task, state = ?TaskState::Pending, "task started");

    let outcome = caller
        .call(task.name(), |attempt| {
            last_attempt = attempt;
            if attempt > 1 {
                let state = TaskState::Retrying { attempt };
                debug!(task = %task, state = ?state, "task retrying");
            }
            let insight = Arc::clone(&insight);
            let prompt = Arc::clone(&prompt);
            async move {
                let raw = insight.generate(&prompt).await?;
                task.parse(&raw)
            }
        })
        .await;

    let result = match outcome {
        Ok(payload) => InsightResult::succeeded(payload, last_attempt),
        Err(err) => InsightResult::failed(task, InsightError::from(&err), err.attempts()),
    };
    match result.error() {
        None => debug!(task = %task, state = ?result.state(), attempts = result.attempts(), "task finished"),
        Some(err) => warn!(task = %task, state = ?result.state(), error = %err.message, "task finished"),
    }
    result
}
