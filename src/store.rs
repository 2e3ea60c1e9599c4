use std::sync::Arc;

use chrono::Utc;
use tracing::error;

use crate::models::{NewTaskRequest, Task, UpdateTaskRequest};
use crate::notify::Notify;
use crate::remote::TaskApi;
use crate::session::AuthState;

/// In-memory cache of the viewer's tasks, kept in step with the remote store.
///
/// Every mutation follows the same contract: validate locally, await the
/// remote ack, and only then touch the cache. A failed remote call leaves the
/// cache exactly as it was; there is nothing speculative to roll back. No
/// client-side locking or version token is held, so concurrent writers
/// resolve last-write-wins at the remote store.
pub struct TaskStore {
    remote: Arc<dyn TaskApi>,
    notifier: Arc<dyn Notify>,
    tasks: Vec<Task>,
    is_loading: bool,
}

impl TaskStore {
    pub fn new(remote: Arc<dyn TaskApi>, notifier: Arc<dyn Notify>) -> Self {
        Self {
            remote,
            notifier,
            tasks: Vec::new(),
            is_loading: false,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Reload the viewer's own tasks, replacing the whole cache. Failures are
    /// logged and notified; the cache keeps its prior value.
    pub async fn fetch_own_tasks(&mut self, viewer: &AuthState) {
        let Some(user_id) = viewer.user_id() else {
            return;
        };
        let user_id = user_id.to_string();

        self.is_loading = true;
        match self.remote.list_tasks_for_user(&user_id).await {
            Ok(tasks) => self.tasks = tasks,
            Err(e) => {
                error!("error fetching tasks: {}", e);
                self.notifier.error("Failed to fetch tasks");
            }
        }
        self.is_loading = false;
    }

    /// Manager view: every employee's tasks joined with the owning profile.
    /// Silently returns for anyone else.
    pub async fn fetch_all_tasks(&mut self, viewer: &AuthState) {
        if !viewer.is_authenticated() || !viewer.is_manager() {
            return;
        }

        self.is_loading = true;
        match self.remote.list_all_tasks().await {
            Ok(tasks) => self.tasks = tasks,
            Err(e) => {
                error!("error fetching employee tasks: {}", e);
                self.notifier.error("Failed to fetch employee tasks");
            }
        }
        self.is_loading = false;
    }

    /// Insert a task for the viewer and append the canonical row the remote
    /// store returns. A blank title is rejected before any remote call.
    pub async fn create_task(&mut self, viewer: &AuthState, req: NewTaskRequest) {
        let Some(user_id) = viewer.user_id() else {
            return;
        };
        let user_id = user_id.to_string();

        if req.title.trim().is_empty() {
            self.notifier.error("Task title is required");
            return;
        }

        self.is_loading = true;
        match self.remote.insert_task(&user_id, &req).await {
            Ok(task) => {
                self.tasks.push(task);
                self.notifier.success("Task created successfully");
            }
            Err(e) => {
                error!("error creating task: {}", e);
                self.notifier.error("Failed to create task");
            }
        }
        self.is_loading = false;
    }

    /// Partial update. The fields sent remotely are merged into the cached
    /// record on ack, together with the refreshed updated_at; no re-fetch.
    pub async fn update_task(&mut self, id: &str, mut changes: UpdateTaskRequest) {
        changes.updated_at = Some(Utc::now());

        self.is_loading = true;
        match self.remote.update_task(id, &changes).await {
            Ok(()) => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    changes.apply_to(task);
                }
                self.notifier.success("Task updated successfully");
            }
            Err(e) => {
                error!("error updating task: {}", e);
                self.notifier.error("Failed to update task");
            }
        }
        self.is_loading = false;
    }

    /// Mark a task done, stamping completed_at and updated_at with one
    /// timestamp. Idempotent: a task the cache already shows as completed is
    /// left alone.
    pub async fn complete_task(&mut self, id: &str) {
        if self
            .tasks
            .iter()
            .any(|t| t.id == id && t.is_completed)
        {
            return;
        }

        let completed_at = Utc::now();
        let changes = UpdateTaskRequest {
            is_completed: Some(true),
            completed_at: Some(completed_at),
            updated_at: Some(completed_at),
            ..Default::default()
        };

        self.is_loading = true;
        match self.remote.update_task(id, &changes).await {
            Ok(()) => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    changes.apply_to(task);
                }
                self.notifier.success("Task completed!");
            }
            Err(e) => {
                error!("error completing task: {}", e);
                self.notifier.error("Failed to complete task");
            }
        }
        self.is_loading = false;
    }

    /// Manager-only annotation. Silently returns for anyone else, touching
    /// neither remote nor local state.
    pub async fn add_feedback(&mut self, viewer: &AuthState, id: &str, feedback: &str) {
        if !viewer.is_manager() {
            return;
        }

        let changes = UpdateTaskRequest {
            feedback: Some(feedback.to_string()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        self.is_loading = true;
        match self.remote.update_task(id, &changes).await {
            Ok(()) => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
                    changes.apply_to(task);
                }
                self.notifier.success("Feedback added successfully");
            }
            Err(e) => {
                error!("error adding feedback: {}", e);
                self.notifier.error("Failed to add feedback");
            }
        }
        self.is_loading = false;
    }
}
