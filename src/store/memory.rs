//! In-memory task store (non-persistent).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::task::TaskList;

use super::{ListSummary, TaskStore};

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    lists: Arc<RwLock<HashMap<Uuid, TaskList>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn list_lists(&self) -> Result<Vec<ListSummary>, String> {
        let mut summaries: Vec<ListSummary> = self
            .lists
            .read()
            .await
            .values()
            .map(|list| ListSummary {
                id: list.id,
                name: list.name.clone(),
                task_count: list.tasks.len(),
                updated_at: list.updated_at.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn load_list(&self, id: Uuid) -> Result<Option<TaskList>, String> {
        Ok(self.lists.read().await.get(&id).cloned())
    }

    async fn save_list(&self, list: &TaskList) -> Result<(), String> {
        self.lists.write().await.insert(list.id, list.clone());
        Ok(())
    }

    async fn delete_list(&self, id: Uuid) -> Result<bool, String> {
        Ok(self.lists.write().await.remove(&id).is_some())
    }
}
