pub mod dto;
pub mod identity;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::AppError;
use crate::models::{NewTaskRequest, Role, Task, UpdateTaskRequest, UserProfile};

pub use identity::{AuthClient, AuthUser, IdentityProvider, MemoryIdentity, OauthProvider, Session};

/// Table-scoped access to the remote data store.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Tasks owned by one user, due_date ascending with nulls last.
    async fn list_tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, AppError>;
    /// Every task joined with its owning profile, same order. Manager view.
    async fn list_all_tasks(&self) -> Result<Vec<Task>, AppError>;
    /// Insert a task and return the canonical row (server id and timestamps).
    async fn insert_task(&self, user_id: &str, req: &NewTaskRequest) -> Result<Task, AppError>;
    /// Partial update of a single task.
    async fn update_task(&self, id: &str, changes: &UpdateTaskRequest) -> Result<(), AppError>;
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;
    async fn insert_profile(&self, user_id: &str, role: Role) -> Result<UserProfile, AppError>;
}

/// HTTP client for the backend's REST data API.
pub struct RestClient {
    client: Client,
    config: BackendConfig,
    access_token: Mutex<Option<String>>,
}

impl RestClient {
    pub fn new(config: BackendConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            client,
            config,
            access_token: Mutex::new(None),
        })
    }

    /// Attach the signed-in user's token so row-level rules apply to them.
    /// Cleared on sign-out by passing `None`; requests then fall back to the
    /// anonymous key.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock().unwrap() = token;
    }

    fn bearer(&self) -> String {
        let guard = self.access_token.lock().unwrap();
        guard.clone().unwrap_or_else(|| self.config.anon_key.clone())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<dto::ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(body);
        Err(AppError::Backend { status, message })
    }
}

#[async_trait]
impl TaskApi for RestClient {
    async fn list_tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, AppError> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .client
            .get(self.table_url("tasks"))
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "due_date.asc.nullslast,created_at.asc"),
            ])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<Vec<Task>>().await?)
    }

    async fn list_all_tasks(&self) -> Result<Vec<Task>, AppError> {
        let response = self
            .client
            .get(self.table_url("tasks"))
            .query(&[
                ("select", "*,profiles!inner(*)"),
                ("order", "due_date.asc.nullslast,created_at.asc"),
            ])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await?;

        let response = self.check(response).await?;
        Ok(response.json::<Vec<Task>>().await?)
    }

    async fn insert_task(&self, user_id: &str, req: &NewTaskRequest) -> Result<Task, AppError> {
        let row = dto::NewTaskRow {
            title: req.title.clone(),
            description: req.description.clone(),
            due_date: req.due_date,
            is_completed: false,
            user_id: user_id.to_string(),
        };

        let response = self
            .client
            .post(self.table_url("tasks"))
            .header("apikey", &self.config.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer())
            .json(&[row])
            .send()
            .await?;

        let response = self.check(response).await?;
        let mut rows = response.json::<Vec<Task>>().await?;
        rows.pop().ok_or(AppError::Backend {
            status: 200,
            message: "insert returned no rows".to_string(),
        })
    }

    async fn update_task(&self, id: &str, changes: &UpdateTaskRequest) -> Result<(), AppError> {
        let response = self
            .client
            .patch(self.table_url("tasks"))
            .query(&[("id", &format!("eq.{}", id))])
            .header("apikey", &self.config.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(self.bearer())
            .json(changes)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .client
            .get(self.table_url("profiles"))
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("limit", "1"),
            ])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await?;

        let response = self.check(response).await?;
        let mut rows = response.json::<Vec<UserProfile>>().await?;
        Ok(rows.pop())
    }

    async fn insert_profile(&self, user_id: &str, role: Role) -> Result<UserProfile, AppError> {
        let row = dto::NewProfileRow {
            user_id: user_id.to_string(),
            role,
        };

        let response = self
            .client
            .post(self.table_url("profiles"))
            .header("apikey", &self.config.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer())
            .json(&[row])
            .send()
            .await?;

        let response = self.check(response).await?;
        let mut rows = response.json::<Vec<UserProfile>>().await?;
        rows.pop().ok_or(AppError::Backend {
            status: 200,
            message: "insert returned no rows".to_string(),
        })
    }
}

#[derive(Default)]
struct MemoryState {
    tasks: Vec<Task>,
    profiles: Vec<UserProfile>,
}

/// In-process stand-in for the data API. Assigns ids and timestamps the way
/// the server would and applies the same ordering policy.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    fail: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, to simulate a network outage.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn add_profile(&self, user_id: &str, full_name: Option<&str>, role: Role) -> UserProfile {
        let now = Utc::now();
        let profile = UserProfile {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            full_name: full_name.map(str::to_string),
            avatar_url: None,
            role,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().profiles.push(profile.clone());
        profile
    }

    /// Read a task back as another client would see it after a refetch.
    pub fn task_by_id(&self, id: &str) -> Option<Task> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub fn task_count(&self) -> usize {
        self.state.lock().unwrap().tasks.len()
    }

    fn guard(&self) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Backend {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn sort_rows(rows: &mut [Task]) {
        rows.sort_by(|a, b| {
            let a_key = (a.due_date.is_none(), a.due_date, a.created_at);
            let b_key = (b.due_date.is_none(), b.due_date, b.created_at);
            a_key.cmp(&b_key)
        });
    }
}

#[async_trait]
impl TaskApi for MemoryBackend {
    async fn list_tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>, AppError> {
        self.guard()?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Task> = state
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Self::sort_rows(&mut rows);
        Ok(rows)
    }

    async fn list_all_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.guard()?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Task> = state
            .tasks
            .iter()
            .cloned()
            .map(|mut task| {
                task.owner = state
                    .profiles
                    .iter()
                    .find(|p| p.user_id == task.user_id)
                    .cloned();
                task
            })
            .collect();
        Self::sort_rows(&mut rows);
        Ok(rows)
    }

    async fn insert_task(&self, user_id: &str, req: &NewTaskRequest) -> Result<Task, AppError> {
        self.guard()?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: req.title.clone(),
            description: req.description.clone(),
            due_date: req.due_date,
            is_completed: false,
            created_at: now,
            updated_at: now,
            user_id: user_id.to_string(),
            feedback: None,
            completed_at: None,
            owner: None,
        };
        self.state.lock().unwrap().tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, changes: &UpdateTaskRequest) -> Result<(), AppError> {
        self.guard()?;
        let mut state = self.state.lock().unwrap();
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) {
            changes.apply_to(task);
        }
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        self.guard()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn insert_profile(&self, user_id: &str, role: Role) -> Result<UserProfile, AppError> {
        self.guard()?;
        Ok(self.add_profile(user_id, None, role))
    }
}
