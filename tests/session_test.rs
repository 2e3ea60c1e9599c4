use std::sync::Arc;

use tasktrack::local::BypassStore;
use tasktrack::models::Role;
use tasktrack::remote::{AuthUser, MemoryBackend, MemoryIdentity, OauthProvider, Session, TaskApi};
use tasktrack::session::{AuthState, SessionManager};
use tasktrack::AppError;

fn manager_with(
    identity: Arc<MemoryIdentity>,
    backend: Arc<MemoryBackend>,
    dir: &tempfile::TempDir,
) -> SessionManager {
    SessionManager::new(
        identity,
        backend,
        BypassStore::new(dir.path().join("state.json")),
    )
}

#[tokio::test]
async fn password_sign_in_loads_profile() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let user_id = identity.register_user("avery@example.com", "hunter2");
    backend.add_profile(&user_id, Some("Avery"), Role::Employee);

    let session = manager_with(identity, backend, &dir);
    session
        .sign_in_with_password("avery@example.com", "hunter2")
        .await
        .expect("sign in");

    let state = session.state();
    assert!(state.is_authenticated());
    assert!(!state.is_manager());
    assert_eq!(state.user_id(), Some(user_id.as_str()));

    let AuthState::Verified { profile, .. } = state else {
        panic!("expected verified state");
    };
    assert_eq!(
        profile.expect("profile").full_name.as_deref(),
        Some("Avery")
    );
}

#[tokio::test]
async fn manager_role_comes_from_the_profile() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let user_id = identity.register_user("robin@example.com", "hunter2");
    backend.add_profile(&user_id, Some("Robin"), Role::Manager);

    let session = manager_with(identity, backend, &dir);
    session
        .sign_in_with_password("robin@example.com", "hunter2")
        .await
        .expect("sign in");

    assert!(session.state().is_manager());
}

#[tokio::test]
async fn blank_credentials_fail_before_any_remote_call() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    backend.set_fail(true);
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity, backend, &dir);
    let err = session
        .sign_in_with_password("", "")
        .await
        .expect_err("validation error");

    assert!(matches!(err, AppError::Validation(_)));
    assert!(!session.state().is_authenticated());
}

#[tokio::test]
async fn bypass_grants_manager_view_without_the_provider() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity, backend, &dir);
    session
        .sign_in_manager_bypass("boss@example.com")
        .expect("bypass");

    let state = session.state();
    assert!(state.is_manager());
    // The bypass never produced a provider-issued user id.
    assert_eq!(state.user_id(), None);
    assert_eq!(state.email(), Some("boss@example.com"));
}

#[tokio::test]
async fn bypass_markers_survive_restart() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity.clone(), backend.clone(), &dir);
    session
        .sign_in_manager_bypass("boss@example.com")
        .expect("bypass");

    // A fresh manager over the same local state restores the bypass on probe.
    let restarted = manager_with(identity, backend, &dir);
    restarted.initialize().await;

    assert!(matches!(
        restarted.state(),
        AuthState::ManagerBypass { email } if email == "boss@example.com"
    ));
}

#[tokio::test]
async fn sign_out_clears_bypass_and_remote_session() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity.clone(), backend.clone(), &dir);
    session
        .sign_in_manager_bypass("boss@example.com")
        .expect("bypass");
    session.sign_out().await;

    assert!(!session.state().is_authenticated());

    let restarted = manager_with(identity, backend, &dir);
    restarted.initialize().await;
    assert!(!restarted.state().is_authenticated());
}

#[tokio::test]
async fn initialize_restores_a_live_session() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let user_id = identity.register_user("avery@example.com", "hunter2");
    backend.add_profile(&user_id, None, Role::Employee);
    identity.set_session(Session {
        access_token: "live-token".to_string(),
        refresh_token: None,
        user: AuthUser {
            id: user_id.clone(),
            email: Some("avery@example.com".to_string()),
        },
    });

    let session = manager_with(identity, backend, &dir);
    session.initialize().await;

    assert_eq!(session.state().user_id(), Some(user_id.as_str()));
}

#[tokio::test]
async fn first_oauth_login_provisions_an_employee_profile() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity, backend.clone(), &dir);
    session
        .complete_oauth(Session {
            access_token: "oauth-token".to_string(),
            refresh_token: None,
            user: AuthUser {
                id: "social-1".to_string(),
                email: Some("new@example.com".to_string()),
            },
        })
        .await
        .expect("oauth completion");

    let state = session.state();
    assert!(state.is_authenticated());
    assert!(!state.is_manager());

    let profile = backend
        .fetch_profile("social-1")
        .await
        .expect("fetch")
        .expect("provisioned profile");
    assert_eq!(profile.role, Role::Employee);
}

#[tokio::test]
async fn sign_up_registers_a_password_login() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity, backend, &dir);
    session
        .sign_up("new@example.com", "hunter2")
        .await
        .expect("sign up");

    // Sign-up does not sign in.
    assert!(!session.state().is_authenticated());

    session
        .sign_in_with_password("new@example.com", "hunter2")
        .await
        .expect("sign in after sign up");
    assert!(session.state().is_authenticated());
}

#[tokio::test]
async fn subscribers_see_state_transitions() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity, backend, &dir);
    let mut rx = session.subscribe();

    session
        .sign_in_manager_bypass("boss@example.com")
        .expect("bypass");

    assert!(rx.has_changed().expect("channel open"));
    assert!(rx.borrow_and_update().is_manager());
}

#[tokio::test]
async fn authorize_url_names_the_provider() {
    let identity = Arc::new(MemoryIdentity::new());
    let backend = Arc::new(MemoryBackend::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let session = manager_with(identity, backend, &dir);
    let url = session.oauth_authorize_url(OauthProvider::Github, "http://localhost/dashboard");
    assert!(url.contains("provider=github"));
}
