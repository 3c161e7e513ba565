//! Sequential crew executor.
//!
//! [`CrewEngine`] runs the steps of a [`ReviewPlan`] one at a time, in
//! declared order. Each step makes exactly one completion call; its
//! instruction is fully rendered (title, primary text, context, labelled
//! outputs of its dependencies) before the call starts. Any failure aborts
//! the run and no body is produced.
//!
//! ```ignore
//! let engine = CrewEngine::new(llm, CrewConfig::default());
//! let plan = catalog::HISTORY_MACRO.plan(None);
//! let outcome = engine
//!     .run(&plan, &RunInputs::new(text), &CancellationToken::new(), None)
//!     .await?;
//! println!("{}", outcome.body);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::{CrewError, CrewResult};
use super::pipeline::ReviewPlan;
use super::registry::{Domain, Tier};
use super::step::{PriorOutput, RunInputs, StepSpec};
use crate::config::AppConfig;
use crate::llm::LlmProvider;

/// Default per-step deadline.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(180);

// ============================================================================
// Configuration
// ============================================================================

/// Deadlines applied to a run. `None` disables a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewConfig {
    /// Upper bound on one completion call.
    pub step_timeout: Option<Duration>,
    /// Upper bound on the whole run.
    pub run_timeout: Option<Duration>,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            step_timeout: Some(DEFAULT_STEP_TIMEOUT),
            run_timeout: None,
        }
    }
}

impl CrewConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            step_timeout: config.step_timeout,
            run_timeout: config.run_timeout,
        }
    }

    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.run_timeout = timeout;
        self
    }
}

// ============================================================================
// Events
// ============================================================================

/// Progress events emitted while a run executes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrewEvent {
    RunStarted {
        domain: Domain,
        tier: Tier,
        pipeline: &'static str,
        total_steps: usize,
        consolidated: bool,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        index: usize,
        total_steps: usize,
        role: &'static str,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        index: usize,
        role: &'static str,
        output_chars: usize,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
    },
    RunCompleted {
        body_chars: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    RunFailed {
        kind: &'static str,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl CrewEvent {
    fn run_started(plan: &ReviewPlan) -> Self {
        Self::RunStarted {
            domain: plan.spec.domain,
            tier: plan.spec.tier,
            pipeline: plan.spec.name,
            total_steps: plan.len(),
            consolidated: plan.consolidated,
            timestamp: Utc::now(),
        }
    }

    fn run_failed(error: &CrewError) -> Self {
        Self::RunFailed {
            kind: error.kind(),
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Output of one executed step. Lives only as long as the run's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub role: &'static str,
    pub output: String,
    pub latency_ms: u64,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct CrewOutcome {
    pub domain: Domain,
    pub tier: Tier,
    pub pipeline: &'static str,
    /// Every step output, in execution order.
    pub steps: Vec<StepRecord>,
    /// Report body: the consolidator's output, or every labelled section.
    pub body: String,
    pub consolidated: bool,
    pub duration_ms: u64,
}

/// Joins step outputs as `## <role>` sections in execution order.
pub fn labelled_sections(steps: &[StepRecord]) -> String {
    steps
        .iter()
        .map(|s| format!("## {}\n\n{}", s.role, s.output.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ============================================================================
// Engine
// ============================================================================

/// Runs review plans against a completion provider.
///
/// The engine holds no per-run state, so one instance can serve concurrent
/// runs.
pub struct CrewEngine {
    llm: Arc<dyn LlmProvider>,
    config: CrewConfig,
}

impl CrewEngine {
    pub fn new(llm: Arc<dyn LlmProvider>, config: CrewConfig) -> Self {
        Self { llm, config }
    }

    pub fn with_defaults(llm: Arc<dyn LlmProvider>) -> Self {
        Self::new(llm, CrewConfig::default())
    }

    pub fn config(&self) -> &CrewConfig {
        &self.config
    }

    /// Executes every step of `plan` and selects the report body.
    ///
    /// Fails with [`CrewError::Configuration`] before any call when the
    /// provider has no credential, and with [`CrewError::EmptyInput`] when
    /// the primary text is blank.
    pub async fn run(
        &self,
        plan: &ReviewPlan,
        inputs: &RunInputs,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<CrewEvent>>,
    ) -> CrewResult<CrewOutcome> {
        let result = self.run_inner(plan, inputs, cancel, events).await;

        match &result {
            Ok(outcome) => {
                tracing::info!(
                    domain = %outcome.domain,
                    tier = %outcome.tier,
                    steps = outcome.steps.len(),
                    duration_ms = outcome.duration_ms,
                    "Review run completed"
                );
                send_event(
                    events,
                    CrewEvent::RunCompleted {
                        body_chars: outcome.body.chars().count(),
                        duration_ms: outcome.duration_ms,
                        timestamp: Utc::now(),
                    },
                )
                .await;
            }
            Err(e) => send_event(events, CrewEvent::run_failed(e)).await,
        }

        result
    }

    async fn run_inner(
        &self,
        plan: &ReviewPlan,
        inputs: &RunInputs,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<CrewEvent>>,
    ) -> CrewResult<CrewOutcome> {
        if !self.llm.is_configured() {
            return Err(CrewError::Configuration(
                "no model credential configured; set IDEAFORGE_API_KEY or GOOGLE_API_KEY"
                    .to_string(),
            ));
        }
        if !inputs.has_primary_text() {
            return Err(CrewError::EmptyInput {
                tier: plan.spec.tier.to_string(),
            });
        }

        tracing::info!(
            domain = %plan.spec.domain,
            tier = %plan.spec.tier,
            pipeline = plan.spec.name,
            steps = plan.len(),
            consolidated = plan.consolidated,
            "Starting review run"
        );
        send_event(events, CrewEvent::run_started(plan)).await;

        let start = Instant::now();
        let steps = match self.config.run_timeout {
            Some(limit) => tokio::time::timeout(limit, self.execute(plan, inputs, cancel, events))
                .await
                .map_err(|_| CrewError::RunTimedOut { limit })??,
            None => self.execute(plan, inputs, cancel, events).await?,
        };

        let body = if plan.consolidated {
            steps
                .last()
                .map(|s| s.output.trim().to_string())
                .unwrap_or_default()
        } else {
            labelled_sections(&steps)
        };

        Ok(CrewOutcome {
            domain: plan.spec.domain,
            tier: plan.spec.tier,
            pipeline: plan.spec.name,
            steps,
            body,
            consolidated: plan.consolidated,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn execute(
        &self,
        plan: &ReviewPlan,
        inputs: &RunInputs,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<CrewEvent>>,
    ) -> CrewResult<Vec<StepRecord>> {
        let total = plan.len();
        let mut records: Vec<StepRecord> = Vec::with_capacity(total);

        for (index, step) in plan.steps.iter().copied().enumerate() {
            if cancel.is_cancelled() {
                return Err(CrewError::Cancelled {
                    completed_steps: index,
                });
            }

            let role = step.persona.role;
            send_event(
                events,
                CrewEvent::StepStarted {
                    index,
                    total_steps: total,
                    role,
                    timestamp: Utc::now(),
                },
            )
            .await;

            let prior: Vec<PriorOutput<'_>> = step
                .depends_on
                .iter()
                .filter_map(|&dep| records.get(dep))
                .map(|record| PriorOutput {
                    role: record.role,
                    text: record.output.as_str(),
                })
                .collect();
            let instruction = step.render_instruction(inputs, &prior);

            let started = Instant::now();
            let output = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(index, role, "Review run cancelled mid-step");
                    return Err(CrewError::Cancelled { completed_steps: index });
                }
                result = self.call_step(index, step, &instruction) => result?,
            };
            let latency_ms = started.elapsed().as_millis() as u64;

            tracing::debug!(index, role, latency_ms, chars = output.len(), "Step completed");
            send_event(
                events,
                CrewEvent::StepCompleted {
                    index,
                    role,
                    output_chars: output.chars().count(),
                    latency_ms,
                    timestamp: Utc::now(),
                },
            )
            .await;

            records.push(StepRecord {
                index,
                role,
                output,
                latency_ms,
            });
        }

        Ok(records)
    }

    /// One completion call, bounded by the step deadline.
    async fn call_step(
        &self,
        index: usize,
        step: &'static StepSpec,
        instruction: &str,
    ) -> CrewResult<String> {
        let role = step.persona.role;
        let preamble = step.persona.preamble();
        let call = self.llm.complete(&preamble, instruction);

        let result = match self.config.step_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| CrewError::StepTimedOut {
                    index,
                    role,
                    limit,
                })?,
            None => call.await,
        };

        result.map_err(|e| CrewError::from_step(index, role, e))
    }
}

async fn send_event(events: Option<&mpsc::Sender<CrewEvent>>, event: CrewEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crew::catalog;
    use crate::error::LlmError;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message, Usage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every request and answers `<role>-OUT`.
    struct RecordingProvider {
        configured: bool,
        fail_on_call: Option<usize>,
        delay: Option<Duration>,
        call_count: AtomicUsize,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl RecordingProvider {
        fn new() -> Self {
            Self {
                configured: true,
                fail_on_call: None,
                delay: None,
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn unconfigured() -> Self {
            Self {
                configured: false,
                ..Self::new()
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::new()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn instruction(&self, call: usize) -> String {
            let requests = self.requests.lock().expect("lock not poisoned");
            requests[call].messages[1].content.clone()
        }
    }

    fn role_of(request: &GenerationRequest) -> String {
        request.messages[0]
            .content
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("You are the "))
            .and_then(|l| l.strip_suffix('.'))
            .unwrap_or("unknown")
            .to_string()
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let role = role_of(&request);
            self.requests
                .lock()
                .expect("lock not poisoned")
                .push(request);

            if self.fail_on_call == Some(idx) {
                return Err(LlmError::ApiError {
                    code: 500,
                    message: "upstream exploded".to_string(),
                });
            }

            Ok(GenerationResponse {
                id: format!("mock-{}", idx),
                model: "mock-model".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(format!("{}-OUT", role)),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            })
        }

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    fn engine(provider: &Arc<RecordingProvider>) -> CrewEngine {
        CrewEngine::with_defaults(provider.clone())
    }

    fn inputs() -> RunInputs {
        RunInputs::new("A desert world with no water magic").with_title("Dune Clone")
    }

    #[tokio::test]
    async fn test_unconsolidated_body_is_labelled_sections() {
        let provider = Arc::new(RecordingProvider::new());
        let plan = catalog::HISTORY_MACRO.plan(None);

        let outcome = engine(&provider)
            .run(&plan, &inputs(), &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 3);
        assert!(!outcome.consolidated);
        assert_eq!(
            outcome.body,
            "## Structural Critic\n\nStructural Critic-OUT\n\n\
             ## Character Psychologist\n\nCharacter Psychologist-OUT\n\n\
             ## Literary Market Agent\n\nLiterary Market Agent-OUT"
        );
    }

    #[tokio::test]
    async fn test_consolidated_body_is_last_output_only() {
        let provider = Arc::new(RecordingProvider::new());
        let plan = catalog::DIGITAL_PRODUCT_MACRO.plan(None);

        let outcome = engine(&provider)
            .run(&plan, &RunInputs::new("A marketplace for used textbooks"), &CancellationToken::new(), None)
            .await
            .unwrap();

        assert_eq!(provider.calls(), 4);
        assert!(outcome.consolidated);
        assert_eq!(outcome.body, "Interim CEO-OUT");
        assert_eq!(outcome.steps.len(), 4);
    }

    #[tokio::test]
    async fn test_consolidator_sees_dependencies_in_order() {
        let provider = Arc::new(RecordingProvider::new());
        let plan = catalog::HISTORY_MACRO.plan(Some(true));

        engine(&provider)
            .run(&plan, &inputs(), &CancellationToken::new(), None)
            .await
            .unwrap();

        let instruction = provider.instruction(3);
        let a = instruction.find("Structural Critic-OUT").unwrap();
        let b = instruction.find("Character Psychologist-OUT").unwrap();
        let c = instruction.find("Literary Market Agent-OUT").unwrap();
        assert!(a < b && b < c);
        assert!(instruction.contains("### Structural Critic\nStructural Critic-OUT"));
    }

    #[tokio::test]
    async fn test_dependent_critic_receives_only_its_dependencies() {
        let provider = Arc::new(RecordingProvider::new());
        let plan = catalog::HISTORY_MACRO.plan(None);

        engine(&provider)
            .run(&plan, &inputs(), &CancellationToken::new(), None)
            .await
            .unwrap();

        let market = provider.instruction(2);
        assert!(market.contains("Structural Critic-OUT"));
        assert!(!market.contains("Character Psychologist-OUT"));
        assert!(market.contains("Dune Clone"));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_makes_no_calls() {
        let provider = Arc::new(RecordingProvider::unconfigured());
        let plan = catalog::HISTORY_MACRO.plan(None);

        let result = engine(&provider)
            .run(&plan, &inputs(), &CancellationToken::new(), None)
            .await;

        assert!(matches!(result, Err(CrewError::Configuration(_))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_calls() {
        let provider = Arc::new(RecordingProvider::new());
        let plan = catalog::HISTORY_MICRO.plan(None);

        let result = engine(&provider)
            .run(&plan, &RunInputs::new("   "), &CancellationToken::new(), None)
            .await;

        assert!(matches!(result, Err(CrewError::EmptyInput { ref tier }) if tier == "micro"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_steps() {
        let provider = Arc::new(RecordingProvider::failing_on(1));
        let plan = catalog::HISTORY_MACRO.plan(None);

        let result = engine(&provider)
            .run(&plan, &inputs(), &CancellationToken::new(), None)
            .await;

        match result {
            Err(CrewError::StepFailed { index, role, .. }) => {
                assert_eq!(index, 1);
                assert_eq!(role, "Character Psychologist");
            }
            other => panic!("expected StepFailed, got {:?}", other.map(|o| o.body)),
        }
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_makes_no_calls() {
        let provider = Arc::new(RecordingProvider::new());
        let plan = catalog::HISTORY_MACRO.plan(None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine(&provider).run(&plan, &inputs(), &cancel, None).await;

        assert!(matches!(result, Err(CrewError::Cancelled { completed_steps: 0 })));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_step_timeout() {
        let provider = Arc::new(RecordingProvider::slow(Duration::from_millis(200)));
        let plan = catalog::HISTORY_MACRO.plan(None);
        let engine = CrewEngine::new(
            provider.clone(),
            CrewConfig::default().with_step_timeout(Some(Duration::from_millis(20))),
        );

        let result = engine.run(&plan, &inputs(), &CancellationToken::new(), None).await;

        match result {
            Err(CrewError::StepTimedOut { index, limit, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(limit, Duration::from_millis(20));
            }
            other => panic!("expected StepTimedOut, got {:?}", other),
        }
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let provider = Arc::new(RecordingProvider::slow(Duration::from_millis(50)));
        let plan = catalog::HISTORY_MACRO.plan(None);
        let engine = CrewEngine::new(
            provider.clone(),
            CrewConfig::default()
                .with_step_timeout(None)
                .with_run_timeout(Some(Duration::from_millis(80))),
        );

        let result = engine.run(&plan, &inputs(), &CancellationToken::new(), None).await;

        match result {
            Err(err @ CrewError::RunTimedOut { .. }) => {
                assert_eq!(err.to_string(), "Review run timed out after 80ms");
            }
            other => panic!("expected RunTimedOut, got {:?}", other),
        }
        assert!(provider.calls() < 3);
    }

    #[tokio::test]
    async fn test_cancel_mid_step() {
        let provider = Arc::new(RecordingProvider::slow(Duration::from_millis(500)));
        let plan = catalog::HISTORY_MACRO.plan(None);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let result = engine(&provider).run(&plan, &inputs(), &cancel, None).await;

        assert!(matches!(result, Err(CrewError::Cancelled { completed_steps: 0 })));
    }

    #[tokio::test]
    async fn test_events_follow_execution() {
        let provider = Arc::new(RecordingProvider::new());
        let plan = catalog::PHYSICAL_VENTURE_MICRO.plan(Some(false));
        let (tx, mut rx) = mpsc::channel(32);

        engine(&provider)
            .run(&plan, &RunInputs::new("Open kitchen layout"), &CancellationToken::new(), Some(&tx))
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 1 + 3 * 2 + 1);
        assert!(matches!(events[0], CrewEvent::RunStarted { total_steps: 3, .. }));
        assert!(matches!(events[1], CrewEvent::StepStarted { index: 0, role: "Experience Architect", .. }));
        assert!(matches!(events[2], CrewEvent::StepCompleted { index: 0, .. }));
        assert!(matches!(events.last(), Some(CrewEvent::RunCompleted { .. })));
    }

    #[tokio::test]
    async fn test_failure_emits_run_failed() {
        let provider = Arc::new(RecordingProvider::unconfigured());
        let plan = catalog::HISTORY_MACRO.plan(None);
        let (tx, mut rx) = mpsc::channel(8);

        let _ = engine(&provider)
            .run(&plan, &inputs(), &CancellationToken::new(), Some(&tx))
            .await;
        drop(tx);

        match rx.recv().await {
            Some(CrewEvent::RunFailed { kind, .. }) => assert_eq!(kind, "configuration"),
            other => panic!("expected RunFailed, got {:?}", other),
        }
    }
}
