#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use postgrest::Postgrest;

use crate::{error::StoreError, rubric::Assignment};

/// Where assignments (and their rubrics) are looked up.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Returns the assignment with this id, or `None` if there is none.
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, StoreError>;
}

/// Assignments held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Assignments by id.
    assignments: HashMap<String, Assignment>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an assignment.
    pub fn insert(&mut self, assignment: Assignment) {
        self.assignments.insert(assignment.id.clone(), assignment);
    }

    /// Builds a store from a JSON array of assignment documents.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let assignments: Vec<Assignment> = serde_json::from_str(json)?;
        Ok(assignments.into_iter().collect())
    }

    /// Reads a JSON array of assignment documents from `path`.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Number of assignments held.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the store holds no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl FromIterator<Assignment> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Assignment>>(iter: I) -> Self {
        let mut store = Self::new();
        for assignment in iter {
            store.insert(assignment);
        }
        store
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, StoreError> {
        Ok(self.assignments.get(id).cloned())
    }
}

/// Assignments read from the `assignments` table of a Supabase project.
#[derive(Clone)]
pub struct PostgrestStore {
    /// Authenticated PostgREST client.
    client: Postgrest,
    /// Table holding assignment documents.
    table:  String,
}

impl PostgrestStore {
    /// Reads from the `assignments` table.
    pub fn new(client: Postgrest) -> Self {
        Self {
            client,
            table: "assignments".to_string(),
        }
    }

    /// Reads from `table` instead of `assignments`.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

#[async_trait]
impl AssignmentStore for PostgrestStore {
    async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, StoreError> {
        let response = self
            .client
            .from(&self.table)
            .eq("id", id)
            .select("*")
            .execute()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Request(format!("{status}: {body}")));
        }

        let rows: Vec<Assignment> = serde_json::from_str(&body)?;
        Ok(rows.into_iter().next())
    }
}
