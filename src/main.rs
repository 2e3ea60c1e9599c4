use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tasktrack::config::BackendConfig;
use tasktrack::local::BypassStore;
use tasktrack::models::NewTaskRequest;
use tasktrack::notify::LogNotifier;
use tasktrack::remote::{AuthClient, RestClient};
use tasktrack::{SessionManager, TaskStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tasktrack=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = BackendConfig::new_from_env()?;
    let rest = Arc::new(RestClient::new(config.clone())?);
    let identity = Arc::new(AuthClient::new(config.clone())?);
    let bypass = BypassStore::new(config.bypass_state_path.clone());

    let session = SessionManager::new(identity, rest.clone(), bypass);
    session.initialize().await;

    let email = std::env::var("TASKTRACK_EMAIL").ok();
    let password = std::env::var("TASKTRACK_PASSWORD").ok();
    if let (Some(email), Some(password)) = (email, password) {
        if let Err(e) = session.sign_in_with_password(&email, &password).await {
            warn!("sign-in failed: {}", e);
        }
    }

    let state = session.state();
    if let Some(user_id) = state.user_id() {
        // Row-level rules need the signed-in user's token, not the anon key.
        if let tasktrack::AuthState::Verified { session: s, .. } = &state {
            rest.set_access_token(Some(s.access_token.clone()));
        }
        info!("signed in as {} ({})", state.email().unwrap_or("?"), user_id);
    } else {
        info!("not signed in; set TASKTRACK_EMAIL / TASKTRACK_PASSWORD to log in");
        return Ok(());
    }

    let mut store = TaskStore::new(rest.clone(), Arc::new(LogNotifier));
    store.fetch_own_tasks(&state).await;
    info!("{} task(s) loaded", store.tasks().len());
    for task in store.tasks() {
        info!(
            "- [{}] {} (due {})",
            if task.is_completed { "x" } else { " " },
            task.title,
            task.due_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    if std::env::var("TASKTRACK_CREATE_DEMO_TASK").is_ok() {
        store
            .create_task(
                &state,
                NewTaskRequest {
                    title: "Try tasktrack".to_string(),
                    description: Some("Created by the demo binary".to_string()),
                    due_date: None,
                },
            )
            .await;
    }

    Ok(())
}
