//! Review entry points.
//!
//! [`ReviewService`] ties the registry, the engine and the report assembler
//! together. [`ReviewService::run`] is the plain text-in/text-out entry;
//! [`ReviewService::review_project`] reviews a stored project and appends the
//! resulting report to it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::engine::{CrewConfig, CrewEngine, CrewEvent, CrewOutcome};
use super::error::{CrewError, CrewResult};
use super::registry::{Domain, DomainRegistry, Tier};
use super::report::{Report, ReportAssembler};
use super::step::RunInputs;
use crate::llm::LlmProvider;
use crate::store::{FieldUpdate, ProjectStatus, ProjectStore};

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    /// Overrides the pipeline's consolidation default.
    pub consolidate: Option<bool>,
    pub cancel: CancellationToken,
    pub events: Option<mpsc::Sender<CrewEvent>>,
}

impl ReviewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consolidate(mut self, consolidate: bool) -> Self {
        self.consolidate = Some(consolidate);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<CrewEvent>) -> Self {
        self.events = Some(events);
        self
    }
}

pub struct ReviewService {
    registry: DomainRegistry,
    engine: CrewEngine,
    store: Arc<dyn ProjectStore>,
    assembler: ReportAssembler,
}

impl ReviewService {
    pub fn new(llm: Arc<dyn LlmProvider>, store: Arc<dyn ProjectStore>, config: CrewConfig) -> Self {
        Self {
            registry: DomainRegistry::with_catalog(),
            engine: CrewEngine::new(llm, config),
            assembler: ReportAssembler::new(store.clone()),
            store,
        }
    }

    /// Replaces the registry, e.g. to add rows beyond the built-in catalog.
    pub fn with_registry(mut self, registry: DomainRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    /// Reviews free text and returns the report body.
    pub async fn run(&self, domain: &str, tier: &str, inputs: RunInputs) -> CrewResult<String> {
        let spec = self.registry.resolve(domain, tier)?;
        let outcome = self
            .run_with(spec.domain, spec.tier, inputs, &ReviewOptions::default())
            .await?;
        Ok(outcome.body)
    }

    /// Reviews free text with explicit options and returns the full outcome.
    pub async fn run_with(
        &self,
        domain: Domain,
        tier: Tier,
        inputs: RunInputs,
        options: &ReviewOptions,
    ) -> CrewResult<CrewOutcome> {
        let spec = self.registry.get(domain, tier)?;
        let plan = spec.plan(options.consolidate);
        self.engine
            .run(&plan, &inputs, &options.cancel, options.events.as_ref())
            .await
    }

    /// Reviews one tier of a stored project.
    ///
    /// Micro reviews use the project's macro text as context. The report is
    /// appended only when the whole run succeeds; a draft project then
    /// becomes validated. Once the report is stored the call succeeds, even
    /// if the status update fails.
    pub async fn review_project(
        &self,
        project_id: Uuid,
        tier: Tier,
        options: &ReviewOptions,
    ) -> CrewResult<Report> {
        let project = self
            .store
            .get_project(project_id)
            .await?
            .ok_or(CrewError::ProjectNotFound(project_id))?;

        let mut inputs = RunInputs::new(project.text(tier)).with_title(project.title.as_str());
        if tier == Tier::Micro {
            inputs = inputs.with_context(project.macro_text.as_str());
        }

        let outcome = self.run_with(project.domain, tier, inputs, options).await?;
        let report = self.assembler.publish(project_id, tier, outcome.body).await?;

        // The report is already stored: from here on the call succeeds.
        if project.status == ProjectStatus::Draft {
            if let Err(e) = self
                .store
                .update_field(project_id, FieldUpdate::Status(ProjectStatus::Validated))
                .await
            {
                tracing::warn!(
                    project_id = %project_id,
                    error = %e,
                    "Report stored but project status not updated"
                );
            }
        }

        Ok(report)
    }
}
