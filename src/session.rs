use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::local::BypassStore;
use crate::models::{Role, UserProfile};
use crate::remote::{IdentityProvider, OauthProvider, Session, TaskApi};

/// Authentication state, with the two login paths kept distinct: a session
/// verified by the identity provider versus the locally flagged manager
/// bypass, which no backend ever checked.
#[derive(Debug, Clone)]
pub enum AuthState {
    Unauthenticated,
    Loading,
    Verified {
        session: Session,
        profile: Option<UserProfile>,
    },
    ManagerBypass {
        email: String,
    },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Verified { .. } | AuthState::ManagerBypass { .. })
    }

    pub fn is_manager(&self) -> bool {
        match self {
            AuthState::ManagerBypass { .. } => true,
            AuthState::Verified { profile, .. } => {
                profile.as_ref().is_some_and(|p| p.role == Role::Manager)
            }
            _ => false,
        }
    }

    /// Provider-issued user id. The bypass path never had one.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthState::Verified { session, .. } => Some(session.user.id.as_str()),
            _ => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            AuthState::Verified { session, .. } => session.user.email.as_deref(),
            AuthState::ManagerBypass { email } => Some(email.as_str()),
            _ => None,
        }
    }
}

/// Tracks the current user and publishes every state transition through a
/// watch channel, the headless equivalent of the provider's auth-state
/// change subscription.
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    data: Arc<dyn TaskApi>,
    bypass: BypassStore,
    state_tx: watch::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        data: Arc<dyn TaskApi>,
        bypass: BypassStore,
    ) -> Self {
        let (state_tx, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            identity,
            data,
            bypass,
            state_tx,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: AuthState) {
        self.state_tx.send_replace(state);
    }

    /// Startup probe. Persisted bypass markers win over the session check;
    /// otherwise ask the identity provider for a live session.
    pub async fn initialize(&self) {
        if let Some(email) = self.bypass.load() {
            info!("restoring manager bypass for {}", email);
            self.set_state(AuthState::ManagerBypass { email });
            return;
        }

        self.set_state(AuthState::Loading);
        match self.identity.get_session().await {
            Ok(Some(session)) => {
                let profile = self.load_profile(&session.user.id).await;
                self.set_state(AuthState::Verified { session, profile });
            }
            Ok(None) => self.set_state(AuthState::Unauthenticated),
            Err(e) => {
                error!("session probe failed: {}", e);
                self.set_state(AuthState::Unauthenticated);
            }
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let session = self.identity.sign_in_with_password(email, password).await?;
        let profile = self.load_profile(&session.user.id).await;
        self.set_state(AuthState::Verified { session, profile });
        Ok(())
    }

    /// Local-only manager login. Persists the two bypass markers and grants
    /// the manager view without contacting the identity provider. Demo
    /// scaffolding, not a security boundary.
    pub fn sign_in_manager_bypass(&self, email: &str) -> Result<(), AppError> {
        if email.trim().is_empty() {
            return Err(AppError::Validation("Email is required".to_string()));
        }

        self.bypass.save(email)?;
        self.set_state(AuthState::ManagerBypass {
            email: email.to_string(),
        });
        Ok(())
    }

    /// URL to open in a browser to start the provider's OAuth flow.
    pub fn oauth_authorize_url(&self, provider: OauthProvider, redirect_to: &str) -> String {
        self.identity.authorize_url(provider, redirect_to)
    }

    /// Finish an OAuth login: provision a default employee profile on first
    /// social login, then enter the verified state.
    pub async fn complete_oauth(&self, session: Session) -> Result<(), AppError> {
        let profile = match self.data.fetch_profile(&session.user.id).await? {
            Some(profile) => profile,
            None => {
                self.data
                    .insert_profile(&session.user.id, Role::Employee)
                    .await?
            }
        };
        self.set_state(AuthState::Verified {
            session,
            profile: Some(profile),
        });
        Ok(())
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        self.identity
            .sign_up(email, password, json!({ "role": "employee" }))
            .await
    }

    /// Clear local state first, then terminate the remote session. The local
    /// state ends unauthenticated even if the remote call fails.
    pub async fn sign_out(&self) {
        if let Err(e) = self.bypass.clear() {
            warn!("failed to clear bypass markers: {}", e);
        }
        self.set_state(AuthState::Unauthenticated);

        if let Err(e) = self.identity.sign_out().await {
            error!("remote sign-out failed: {}", e);
        }
    }

    async fn load_profile(&self, user_id: &str) -> Option<UserProfile> {
        match self.data.fetch_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                error!("failed to fetch profile for {}: {}", user_id, e);
                None
            }
        }
    }
}
