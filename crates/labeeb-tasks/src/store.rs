//! Task store: tasks, their embeddings, and the nearest-neighbour index.
//!
//! The store is the only owner of the three parallel collections and keeps
//! them aligned: `tasks[i]`, `embeddings[i]` and index position `i` always
//! describe the same task. Embedding failures never fail an operation; the
//! store substitutes a zero vector (add/load), returns every task (search),
//! or reports that it could not understand the request (delete).

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use labeeb_core::config::TasksConfig;
use labeeb_core::text::normalize;
use labeeb_core::{local_now, Task};
use labeeb_vector::{DynEmbeddingService, EmbeddingIndex};
use tracing::{debug, info, warn};

use crate::error::TaskError;
use crate::file::TaskFile;
use crate::time_parser::parse_date_at;

/// Phrases that select the most recently added task for deletion.
const LAST_TASK_PHRASES: &[&str] = &["اخر مهمه", "المهمه الاخيره", "last task"];

/// Phrases that select the first task for deletion.
const FIRST_TASK_PHRASES: &[&str] = &["اول مهمه", "المهمه الاولي", "first task"];

/// What `load` found on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Malformed entries that were dropped.
    pub skipped: usize,
    /// Tasks indexed with a zero vector because embedding failed.
    pub degraded: usize,
}

/// How a delete request was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The task was removed and the file rewritten.
    Deleted(Task),
    /// There was nothing to delete.
    Empty,
    /// The query could not be embedded.
    NotUnderstood,
    /// The index returned no usable hit.
    NoMatch,
}

/// Embedding of one text, or the reason it could not be produced.
enum Embedded {
    Vector(Vec<f32>),
    Failed(String),
}

/// Owned task memory with file persistence and semantic search.
pub struct TaskStore {
    file: TaskFile,
    embedder: Arc<dyn DynEmbeddingService>,
    dimension: usize,
    search_k: usize,
    window_days: i64,
    tasks: Vec<Task>,
    embeddings: Vec<Vec<f32>>,
    index: EmbeddingIndex,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("path", &self.file.path())
            .field("dimension", &self.dimension)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl TaskStore {
    /// Create an empty store persisting to `path`. Nothing is read until
    /// [`TaskStore::load`] is called.
    pub fn new(
        path: impl Into<PathBuf>,
        embedder: Arc<dyn DynEmbeddingService>,
        config: &TasksConfig,
    ) -> Self {
        Self {
            file: TaskFile::new(path),
            embedder,
            dimension: config.embedding_dim,
            search_k: config.search_k,
            window_days: config.date_window_days,
            tasks: Vec::new(),
            embeddings: Vec::new(),
            index: EmbeddingIndex::new(config.embedding_dim),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    /// Default `k` for [`TaskStore::search`].
    pub fn search_k(&self) -> usize {
        self.search_k
    }

    /// Replace the in-memory state with the persisted task list.
    ///
    /// Embeddings are recomputed; a task whose embedding fails is kept with
    /// a zero vector. On error the current state is left untouched.
    pub async fn load(&mut self) -> Result<LoadReport, TaskError> {
        let contents = self.file.read()?;

        let mut tasks = Vec::with_capacity(contents.entries.len());
        let mut embeddings = Vec::with_capacity(contents.entries.len());
        let mut report = LoadReport {
            skipped: contents.skipped,
            ..LoadReport::default()
        };

        for entry in contents.entries {
            let embedding = match self.embed(&entry.text).await {
                Embedded::Vector(v) => v,
                Embedded::Failed(reason) => {
                    warn!(task = %entry.text, %reason, "Embedding failed on load, using zero vector");
                    report.degraded += 1;
                    self.zero_vector()
                }
            };
            tasks.push(Task::new(entry.text, entry.time));
            embeddings.push(embedding);
        }

        self.index.rebuild(embeddings.iter().cloned())?;
        self.tasks = tasks;
        self.embeddings = embeddings;
        report.loaded = self.tasks.len();

        info!(
            path = %self.file.path().display(),
            loaded = report.loaded,
            skipped = report.skipped,
            degraded = report.degraded,
            "Tasks loaded"
        );
        Ok(report)
    }

    /// Register a task scheduled from the date expression in `text`, or now.
    pub async fn add(&mut self, text: &str) -> Result<Task, TaskError> {
        self.add_at(text, local_now()).await
    }

    /// [`TaskStore::add`] relative to an explicit clock.
    pub async fn add_at(&mut self, text: &str, now: NaiveDateTime) -> Result<Task, TaskError> {
        let text = text.trim();
        let scheduled = parse_date_at(text, now).unwrap_or(now);

        let embedding = match self.embed(text).await {
            Embedded::Vector(v) => v,
            Embedded::Failed(reason) => {
                warn!(task = %text, %reason, "Embedding failed for new task, using zero vector");
                self.zero_vector()
            }
        };

        let task = Task::with_created_at(text, scheduled, now);
        self.index.add(embedding.clone())?;
        self.tasks.push(task.clone());
        self.embeddings.push(embedding);

        if let Err(e) = self.save() {
            // Keep memory and disk consistent: undo the append.
            self.tasks.pop();
            self.embeddings.pop();
            self.rebuild_index()?;
            return Err(e);
        }

        info!(task = %task.text, scheduled = %task.scheduled_time, "Task registered");
        Ok(task)
    }

    /// Retrieve tasks relevant to `query`.
    ///
    /// A date expression in the query selects every task within the date
    /// window of that date, ignoring `k`. Otherwise the `k` nearest tasks
    /// are returned nearest first. If the query cannot be embedded every
    /// task is returned.
    pub async fn search(&self, query: &str, k: usize) -> Vec<Task> {
        self.search_at(query, k, local_now()).await
    }

    /// [`TaskStore::search`] relative to an explicit clock.
    pub async fn search_at(&self, query: &str, k: usize, now: NaiveDateTime) -> Vec<Task> {
        if self.tasks.is_empty() {
            return Vec::new();
        }

        if let Some(target) = parse_date_at(query, now) {
            let target = target.date();
            let matches: Vec<Task> = self
                .tasks
                .iter()
                .filter(|t| (t.scheduled_time.date() - target).num_days().abs() <= self.window_days)
                .cloned()
                .collect();
            debug!(%target, matches = matches.len(), "Date-filtered task search");
            return matches;
        }

        let query_vector = match self.embed(query).await {
            Embedded::Vector(v) => v,
            Embedded::Failed(reason) => {
                warn!(%query, %reason, "Query embedding failed, returning all tasks");
                return self.tasks.clone();
            }
        };

        match self.index.search(&query_vector, k) {
            Ok(hits) => hits
                .into_iter()
                .filter_map(|hit| self.tasks.get(hit.position).cloned())
                .collect(),
            Err(e) => {
                warn!(error = %e, "Index search failed, returning all tasks");
                self.tasks.clone()
            }
        }
    }

    /// Delete the single task `query` refers to.
    ///
    /// "Last task" and "first task" phrases select by insertion order;
    /// anything else deletes the nearest semantic match.
    pub async fn delete(&mut self, query: &str) -> Result<DeleteOutcome, TaskError> {
        if self.tasks.is_empty() {
            return Ok(DeleteOutcome::Empty);
        }

        let normalized = normalize(query);
        let position = if LAST_TASK_PHRASES.iter().any(|p| normalized.contains(p)) {
            debug!("Delete targets the most recent task");
            self.tasks.len() - 1
        } else if FIRST_TASK_PHRASES.iter().any(|p| normalized.contains(p)) {
            debug!("Delete targets the first task");
            0
        } else {
            let query_vector = match self.embed(query).await {
                Embedded::Vector(v) => v,
                Embedded::Failed(reason) => {
                    warn!(%query, %reason, "Delete query embedding failed");
                    return Ok(DeleteOutcome::NotUnderstood);
                }
            };
            match self.index.search(&query_vector, 1)?.first() {
                Some(hit) if hit.position < self.tasks.len() => hit.position,
                _ => return Ok(DeleteOutcome::NoMatch),
            }
        };

        let removed_task = self.tasks.remove(position);
        let removed_embedding = self.embeddings.remove(position);
        self.rebuild_index()?;

        if let Err(e) = self.save() {
            self.tasks.insert(position, removed_task);
            self.embeddings.insert(position, removed_embedding);
            self.rebuild_index()?;
            return Err(e);
        }

        info!(task = %removed_task.text, position, "Task deleted");
        Ok(DeleteOutcome::Deleted(removed_task))
    }

    /// Remove every task and persist the empty list.
    pub fn clear_all(&mut self) -> Result<(), TaskError> {
        let count = self.tasks.len();
        self.tasks.clear();
        self.embeddings.clear();
        self.index.reset();
        self.save()?;
        info!(removed = count, "All tasks cleared");
        Ok(())
    }

    /// Rewrite the task file from the in-memory list.
    pub fn save(&self) -> Result<(), TaskError> {
        self.file.write(&self.tasks)
    }

    fn rebuild_index(&mut self) -> Result<(), TaskError> {
        self.index.rebuild(self.embeddings.iter().cloned())?;
        Ok(())
    }

    fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.dimension]
    }

    async fn embed(&self, text: &str) -> Embedded {
        match self.embedder.embed_boxed(text).await {
            Ok(v) if v.len() == self.dimension => Embedded::Vector(v),
            Ok(v) => Embedded::Failed(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                v.len()
            )),
            Err(e) => Embedded::Failed(e.to_string()),
        }
    }
}
