//! In-process project store.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FieldUpdate, NewProject, Project, ProjectStore, ReportList, StoreResult};
use crate::chat::ChatMessage;
use crate::crew::{Domain, Report, Tier};
use crate::error::StoreError;

/// Keeps projects in creation order behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: RwLock<Vec<Project>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let project = Project::from_new(new);
        self.projects.write().await.push(project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_projects(&self, owner_email: &str, domain: Domain) -> StoreResult<Vec<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .iter()
            .filter(|p| p.owner_email == owner_email && p.domain == domain)
            .cloned()
            .collect())
    }

    async fn update_field(&self, id: Uuid, update: FieldUpdate) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        update.apply(project);
        Ok(())
    }

    async fn append_report(&self, id: Uuid, list: ReportList, report: Report) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        list.list_mut(project).push(report);
        Ok(())
    }

    async fn append_chat(
        &self,
        id: Uuid,
        tier: Tier,
        messages: Vec<ChatMessage>,
    ) -> StoreResult<()> {
        let mut projects = self.projects.write().await;
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        project.chat_mut(tier).extend(messages);
        Ok(())
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut projects = self.projects.write().await;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok(projects.len() != before)
    }
}
