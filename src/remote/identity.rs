use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Client, Url};
use uuid::Uuid;

use crate::config::BackendConfig;
use crate::error::AppError;
use crate::remote::dto;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OauthProvider {
    Google,
    Facebook,
    Github,
}

impl OauthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OauthProvider::Google => "google",
            OauthProvider::Facebook => "facebook",
            OauthProvider::Github => "github",
        }
    }
}

/// External identity provider, as seen by the session layer.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if one is held.
    async fn get_session(&self) -> Result<Option<Session>, AppError>;
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AppError>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError>;
    async fn sign_out(&self) -> Result<(), AppError>;
    /// URL the caller should open to run the provider's OAuth flow.
    fn authorize_url(&self, provider: OauthProvider, redirect_to: &str) -> String;
}

/// HTTP client for the backend's identity endpoints.
pub struct AuthClient {
    client: Client,
    config: BackendConfig,
    session: Mutex<Option<Session>>,
}

impl AuthClient {
    pub fn new(config: BackendConfig) -> Result<Self, AppError> {
        let client = Client::builder().build().map_err(AppError::Http)?;
        Ok(Self {
            client,
            config,
            session: Mutex::new(None),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<dto::AuthErrorBody>(&body)
            .ok()
            .and_then(dto::AuthErrorBody::into_message)
            .unwrap_or(body);
        Err(AppError::Auth(message))
    }
}

#[async_trait]
impl IdentityProvider for AuthClient {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let request_body = dto::PasswordGrantRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config.anon_key)
            .json(&request_body)
            .send()
            .await?;

        let response = self.check(response).await?;
        let token = response.json::<dto::TokenResponse>().await?;

        let session = Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            user: AuthUser {
                id: token.user.id,
                email: token.user.email,
            },
        };
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        let request_body = dto::SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            data: metadata,
        };

        let response = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.config.anon_key)
            .json(&request_body)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let session = self.session.lock().unwrap().take();
        let Some(session) = session else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    fn authorize_url(&self, provider: OauthProvider, redirect_to: &str) -> String {
        let mut url = Url::parse(&self.auth_url("authorize"))
            .unwrap_or_else(|_| Url::parse("http://localhost").unwrap());
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("provider", provider.as_str());
            pairs.append_pair("redirect_to", redirect_to);
            pairs.append_pair("access_type", "offline");
            pairs.append_pair("prompt", "consent");
            if provider == OauthProvider::Google {
                pairs.append_pair("scopes", "profile email");
            }
        }
        url.to_string()
    }
}

struct MemoryUser {
    password: String,
    user_id: String,
}

/// In-process identity provider for tests and the offline demo.
#[derive(Default)]
pub struct MemoryIdentity {
    users: Mutex<HashMap<String, MemoryUser>>,
    session: Mutex<Option<Session>>,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register an account, returning its user id.
    pub fn register_user(&self, email: &str, password: &str) -> String {
        let user_id = Uuid::new_v4().to_string();
        self.users.lock().unwrap().insert(
            email.to_string(),
            MemoryUser {
                password: password.to_string(),
                user_id: user_id.clone(),
            },
        );
        user_id
    }

    /// Inject a live session, as after an OAuth redirect.
    pub fn set_session(&self, session: Session) {
        *self.session.lock().unwrap() = Some(session);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        let users = self.users.lock().unwrap();
        let user = users
            .get(email)
            .filter(|u| u.password == password)
            .ok_or_else(|| AppError::Auth("Invalid login credentials".to_string()))?;

        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: None,
            user: AuthUser {
                id: user.user_id.clone(),
                email: Some(email.to_string()),
            },
        };
        drop(users);
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: serde_json::Value,
    ) -> Result<(), AppError> {
        if self.users.lock().unwrap().contains_key(email) {
            return Err(AppError::Auth("User already registered".to_string()));
        }
        self.register_user(email, password);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    fn authorize_url(&self, provider: OauthProvider, redirect_to: &str) -> String {
        format!(
            "memory://authorize?provider={}&redirect_to={}",
            provider.as_str(),
            redirect_to
        )
    }
}
