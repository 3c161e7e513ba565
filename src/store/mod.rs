//! Project records and their storage.
//!
//! A project holds both tiers of one idea: the macro and micro drafts, the
//! chat transcript behind each draft, and the reports produced by review
//! runs. Storage is behind the [`ProjectStore`] trait:
//!
//! - [`SqliteStore`]: sqlx/SQLite, used by the CLI
//! - [`MemoryStore`]: in-process, used by tests and embedders
//!
//! Reports are append-only. Nothing in this module edits or removes a report
//! once it has been stored.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::ChatMessage;
use crate::crew::{Domain, Report, Tier};
use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Lifecycle of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Validated,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Validated => "validated",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" | "rascunho" => Ok(Self::Draft),
            "validated" => Ok(Self::Validated),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// One stored project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub owner_email: String,
    pub title: String,
    pub description: String,
    pub domain: Domain,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub macro_text: String,
    pub micro_text: String,
    pub macro_chat: Vec<ChatMessage>,
    pub micro_chat: Vec<ChatMessage>,
    /// Oldest first.
    pub reports_macro: Vec<Report>,
    /// Oldest first.
    pub reports_micro: Vec<Report>,
}

impl Project {
    /// Builds a fresh draft record.
    pub fn from_new(new: NewProject) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_email: new.owner_email,
            title: new.title,
            description: new.description,
            domain: new.domain,
            status: ProjectStatus::Draft,
            created_at: Utc::now(),
            macro_text: String::new(),
            micro_text: String::new(),
            macro_chat: Vec::new(),
            micro_chat: Vec::new(),
            reports_macro: Vec::new(),
            reports_micro: Vec::new(),
        }
    }

    pub fn text(&self, tier: Tier) -> &str {
        match tier {
            Tier::Macro => &self.macro_text,
            Tier::Micro => &self.micro_text,
        }
    }

    pub fn chat(&self, tier: Tier) -> &[ChatMessage] {
        match tier {
            Tier::Macro => &self.macro_chat,
            Tier::Micro => &self.micro_chat,
        }
    }

    fn chat_mut(&mut self, tier: Tier) -> &mut Vec<ChatMessage> {
        match tier {
            Tier::Macro => &mut self.macro_chat,
            Tier::Micro => &mut self.micro_chat,
        }
    }

    /// Stored reports for a tier, oldest first.
    pub fn reports(&self, tier: Tier) -> &[Report] {
        match tier {
            Tier::Macro => &self.reports_macro,
            Tier::Micro => &self.reports_micro,
        }
    }

    /// Reports for a tier in display order.
    pub fn reports_newest_first(&self, tier: Tier) -> Vec<&Report> {
        self.reports(tier).iter().rev().collect()
    }

    pub fn latest_report(&self, tier: Tier) -> Option<&Report> {
        self.reports(tier).last()
    }
}

/// Fields supplied when creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub owner_email: String,
    pub title: String,
    pub description: String,
    pub domain: Domain,
}

impl NewProject {
    pub fn new(owner_email: impl Into<String>, title: impl Into<String>, domain: Domain) -> Self {
        Self {
            owner_email: owner_email.into(),
            title: title.into(),
            description: String::new(),
            domain,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A single-field update. Report lists are not updatable; they only grow
/// through [`ProjectStore::append_report`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Title(String),
    Description(String),
    Status(ProjectStatus),
    Text { tier: Tier, text: String },
    Chat { tier: Tier, messages: Vec<ChatMessage> },
}

impl FieldUpdate {
    /// Stored field the update targets.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::Description(_) => "description",
            Self::Status(_) => "status",
            Self::Text { tier: Tier::Macro, .. } => "macro_text",
            Self::Text { tier: Tier::Micro, .. } => "micro_text",
            Self::Chat { tier: Tier::Macro, .. } => "macro_chat",
            Self::Chat { tier: Tier::Micro, .. } => "micro_chat",
        }
    }

    /// Applies the update to an in-memory record.
    pub fn apply(self, project: &mut Project) {
        match self {
            Self::Title(title) => project.title = title,
            Self::Description(description) => project.description = description,
            Self::Status(status) => project.status = status,
            Self::Text { tier: Tier::Macro, text } => project.macro_text = text,
            Self::Text { tier: Tier::Micro, text } => project.micro_text = text,
            Self::Chat { tier: Tier::Macro, messages } => project.macro_chat = messages,
            Self::Chat { tier: Tier::Micro, messages } => project.micro_chat = messages,
        }
    }
}

/// Which report list a report is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportList {
    Macro,
    Micro,
}

impl ReportList {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Macro => "reports_macro",
            Self::Micro => "reports_micro",
        }
    }

    fn list_mut<'a>(&self, project: &'a mut Project) -> &'a mut Vec<Report> {
        match self {
            Self::Macro => &mut project.reports_macro,
            Self::Micro => &mut project.reports_micro,
        }
    }
}

impl From<Tier> for ReportList {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Macro => Self::Macro,
            Tier::Micro => Self::Micro,
        }
    }
}

/// Persistent collection of projects.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Stores a new draft project and returns it.
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Projects of one owner in one domain, oldest first.
    async fn list_projects(&self, owner_email: &str, domain: Domain) -> StoreResult<Vec<Project>>;

    /// Replaces one field. Fails with [`StoreError::NotFound`] for unknown ids.
    async fn update_field(&self, id: Uuid, update: FieldUpdate) -> StoreResult<()>;

    /// Appends a report to the end of a list. Existing entries are never touched.
    ///
    /// Concurrent appends to the same project must all land.
    async fn append_report(&self, id: Uuid, list: ReportList, report: Report) -> StoreResult<()>;

    /// Appends messages, in order, to the end of one tier's chat transcript.
    ///
    /// Same atomicity as [`ProjectStore::append_report`].
    async fn append_chat(
        &self,
        id: Uuid,
        tier: Tier,
        messages: Vec<ChatMessage>,
    ) -> StoreResult<()>;

    /// Returns whether a project was removed.
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;

    /// Loads a project or fails with [`StoreError::NotFound`].
    async fn require_project(&self, id: Uuid) -> StoreResult<Project> {
        self.get_project(id).await?.ok_or(StoreError::NotFound(id))
    }
}
