//! Report assembly.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::registry::Tier;
use crate::error::StoreError;
use crate::store::{ProjectStore, ReportList};

/// Display format of [`Report::date`].
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// A timestamped report body. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Creation time, formatted with [`REPORT_DATE_FORMAT`].
    pub date: String,
    pub content: String,
}

impl Report {
    /// Stamps `content` with the given time.
    pub fn at<Tz: TimeZone>(when: &DateTime<Tz>, content: impl Into<String>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            date: when.format(REPORT_DATE_FORMAT).to_string(),
            content: content.into(),
        }
    }

    /// Stamps `content` with the current local time.
    pub fn now(content: impl Into<String>) -> Self {
        Self::at(&Local::now(), content)
    }
}

/// Wraps pipeline output as a [`Report`] and appends it to a project.
pub struct ReportAssembler {
    store: Arc<dyn ProjectStore>,
}

impl ReportAssembler {
    pub fn new(store: Arc<dyn ProjectStore>) -> Self {
        Self { store }
    }

    /// Builds a report stamped with the current time.
    pub fn assemble(&self, content: impl Into<String>) -> Report {
        Report::now(content)
    }

    /// Stores a report for `tier` and returns it for immediate display.
    pub async fn publish(
        &self,
        project_id: Uuid,
        tier: Tier,
        content: impl Into<String>,
    ) -> Result<Report, StoreError> {
        let report = self.assemble(content);
        self.store
            .append_report(project_id, ReportList::from(tier), report.clone())
            .await?;
        tracing::info!(project = %project_id, tier = %tier, date = %report.date, "Report published");
        Ok(report)
    }
}
