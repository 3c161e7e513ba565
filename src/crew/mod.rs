//! Multi-critic review pipeline.
//!
//! A review runs a fixed crew of critic personas over one tier of an idea.
//! Critics run strictly one after another; a critic may read the output of
//! earlier critics, and an optional consolidation step merges them all into
//! a single report.
//!
//! # Layers
//!
//! - [`persona`] / [`step`]: passive definitions and instruction rendering
//! - [`pipeline`] / [`catalog`]: the six (domain, tier) crews as `const` data
//! - [`registry`]: strict `(domain, tier)` lookup
//! - [`engine`]: sequential execution with deadlines, cancellation and events
//! - [`report`] / [`service`]: timestamping, persistence, project-level review
//!
//! # Example
//!
//! ```ignore
//! use ideaforge::crew::{CrewConfig, ReviewService, RunInputs};
//!
//! let service = ReviewService::new(llm, store, CrewConfig::default());
//! let body = service
//!     .run(
//!         "history",
//!         "macro",
//!         RunInputs::new("A desert world with no water magic").with_title("Dune Clone"),
//!     )
//!     .await?;
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod persona;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod service;
pub mod step;

pub use engine::{labelled_sections, CrewConfig, CrewEngine, CrewEvent, CrewOutcome, StepRecord};
pub use error::{CrewError, CrewResult};
pub use persona::Persona;
pub use pipeline::{PipelineSpec, ReviewPlan};
pub use registry::{Domain, DomainRegistry, Tier};
pub use report::{Report, ReportAssembler, REPORT_DATE_FORMAT};
pub use service::{ReviewOptions, ReviewService};
pub use step::{fill_template, PriorOutput, RunInputs, StepSpec, NO_CONTEXT, UNTITLED};
