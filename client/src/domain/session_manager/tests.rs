//! Regression coverage for the session lifecycle.

use std::sync::Arc;

use mockall::Sequence;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;
use crate::domain::ports::{
    InMemorySessionStore, LoginGrant, LoginRedirect, MockAuthApi, MockSessionStore, SessionStore,
};
use crate::domain::{ErrorKind, HttpPipeline, MovieFilters, MovieService};
use crate::test_support::{FixtureClock, RecordingRedirect, ScriptedTransport};

const ALICE_JSON: &str = r#"{"id":"1","username":"alice"}"#;

fn alice() -> User {
    User::try_from_strings("1", "alice").expect("valid user")
}

fn token(raw: &str) -> AuthToken {
    AuthToken::new(raw).expect("valid token")
}

fn credentials() -> LoginCredentials {
    LoginCredentials::try_from_parts("a", "b").expect("valid credentials")
}

#[fixture]
fn signed_in_store() -> Arc<InMemorySessionStore> {
    Arc::new(InMemorySessionStore::with_entries([
        (StorageKey::Token, "t1"),
        (StorageKey::User, ALICE_JSON),
    ]))
}

fn manager(auth: MockAuthApi, store: &Arc<InMemorySessionStore>) -> SessionManager {
    SessionManager::new(Arc::new(auth), Arc::clone(store) as Arc<dyn SessionStore>)
}

fn stored(store: &InMemorySessionStore, key: StorageKey) -> Option<String> {
    store.get(key).expect("store read")
}

async fn signed_in(auth: MockAuthApi, store: &Arc<InMemorySessionStore>) -> SessionManager {
    let manager = manager(auth, store);
    manager.initialize().await;
    assert!(manager.is_authenticated(), "fixture session should restore");
    manager
}

#[rstest]
#[tokio::test]
async fn initialize_restores_persisted_session_without_network(
    signed_in_store: Arc<InMemorySessionStore>,
) {
    let mut auth = MockAuthApi::new();
    auth.expect_current_user().times(0);
    auth.expect_refresh().times(0);
    let manager = manager(auth, &signed_in_store);
    assert_eq!(manager.phase(), SessionPhase::Uninitialized);

    let session = manager.initialize().await;

    assert_eq!(manager.phase(), SessionPhase::Authenticated);
    assert!(!manager.is_loading());
    assert_eq!(session.user.map(|u| u.username().to_owned()).as_deref(), Some("alice"));
    assert_eq!(manager.token().map(|t| t.as_str().to_owned()).as_deref(), Some("t1"));
}

#[rstest]
#[case::token_only(vec![(StorageKey::Token, "t1")])]
#[case::user_only(vec![(StorageKey::User, ALICE_JSON)])]
#[case::garbled_user(vec![(StorageKey::Token, "t1"), (StorageKey::User, "{not json")])]
#[case::blank_token(vec![(StorageKey::Token, " "), (StorageKey::User, ALICE_JSON)])]
#[case::empty(vec![])]
#[tokio::test]
async fn initialize_clears_incomplete_storage(#[case] entries: Vec<(StorageKey, &'static str)>) {
    let store = Arc::new(InMemorySessionStore::with_entries(entries));
    let manager = manager(MockAuthApi::new(), &store);

    let session = manager.initialize().await;

    assert!(!session.is_authenticated());
    assert_eq!(manager.phase(), SessionPhase::Anonymous);
    assert!(!manager.is_loading());
    assert_eq!(stored(&store, StorageKey::Token), None);
    assert_eq!(stored(&store, StorageKey::User), None);
}

#[rstest]
#[tokio::test]
async fn initialize_runs_once(signed_in_store: Arc<InMemorySessionStore>) {
    let manager = signed_in(MockAuthApi::new(), &signed_in_store).await;
    signed_in_store.clear().expect("clear");

    let session = manager.initialize().await;

    assert!(session.is_authenticated(), "second initialise must not re-read storage");
}

#[tokio::test]
async fn login_round_trips_to_storage() {
    let store = Arc::new(InMemorySessionStore::new());
    let mut auth = MockAuthApi::new();
    auth.expect_login()
        .withf(|creds| creds.username() == "a" && creds.password() == "b")
        .times(1)
        .return_once(|_| {
            Ok(LoginGrant {
                user: alice(),
                token: token("t1"),
            })
        });
    let manager = manager(auth, &store);
    manager.initialize().await;

    let user = manager.login(credentials()).await.expect("login succeeds");

    assert_eq!(user, alice());
    assert_eq!(stored(&store, StorageKey::Token).as_deref(), Some("t1"));
    let persisted: User =
        serde_json::from_str(&stored(&store, StorageKey::User).expect("user stored"))
            .expect("stored user parses");
    assert_eq!(persisted, user);
    assert_eq!(manager.phase(), SessionPhase::Authenticated);
    assert!(!manager.is_loading());
}

#[tokio::test]
async fn login_writes_token_before_user() {
    let mut store = MockSessionStore::new();
    let mut sequence = Sequence::new();
    store
        .expect_set()
        .withf(|key, value| *key == StorageKey::Token && value.to_string() == "t1")
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Ok(()));
    store
        .expect_set()
        .withf(|key, _| *key == StorageKey::User)
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_, _| Ok(()));
    let mut auth = MockAuthApi::new();
    auth.expect_login().return_once(|_| {
        Ok(LoginGrant {
            user: alice(),
            token: token("t1"),
        })
    });
    let manager = SessionManager::new(Arc::new(auth), Arc::new(store));

    manager.login(credentials()).await.expect("login succeeds");

    assert!(manager.is_authenticated());
}

#[rstest]
#[tokio::test]
async fn failed_login_keeps_previous_session(signed_in_store: Arc<InMemorySessionStore>) {
    let mut auth = MockAuthApi::new();
    auth.expect_login()
        .times(1)
        .return_once(|_| Err(ApiError::http(401, "Invalid credentials", "")));
    let manager = signed_in(auth, &signed_in_store).await;
    let before = manager.session();

    let err = manager.login(credentials()).await.expect_err("login must fail");

    assert!(err.is_unauthorized());
    assert_eq!(manager.session(), before);
    assert!(!manager.is_loading());
    assert_eq!(stored(&signed_in_store, StorageKey::Token).as_deref(), Some("t1"));
}

#[rstest]
#[case::network(ApiError::network())]
#[case::server(ApiError::http(500, "boom", ""))]
#[tokio::test]
async fn logout_never_fails_and_clears_everything(
    signed_in_store: Arc<InMemorySessionStore>,
    #[case] remote_failure: ApiError,
) {
    let mut auth = MockAuthApi::new();
    auth.expect_logout()
        .withf(|t| t.as_str() == "t1")
        .times(1)
        .return_once(move |_| Err(remote_failure));
    let manager = signed_in(auth, &signed_in_store).await;

    manager.logout().await;

    assert_eq!(manager.session(), Session::default());
    assert_eq!(manager.phase(), SessionPhase::Anonymous);
    assert_eq!(stored(&signed_in_store, StorageKey::Token), None);
    assert_eq!(stored(&signed_in_store, StorageKey::User), None);
}

#[tokio::test]
async fn anonymous_logout_skips_remote_call() {
    let store = Arc::new(InMemorySessionStore::new());
    let mut auth = MockAuthApi::new();
    auth.expect_logout().times(0);
    let manager = manager(auth, &store);
    manager.initialize().await;

    manager.logout().await;

    assert_eq!(manager.phase(), SessionPhase::Anonymous);
}

#[tokio::test]
async fn refresh_without_token_fails_locally() {
    let store = Arc::new(InMemorySessionStore::new());
    let mut auth = MockAuthApi::new();
    auth.expect_refresh().times(0);
    let manager = manager(auth, &store);
    manager.initialize().await;
    let before = manager.session();

    let err = manager.refresh_token().await.expect_err("must fail");

    assert_eq!(err.kind(), ErrorKind::NoToken);
    assert_eq!(err.code(), "NO_TOKEN");
    assert_eq!(err.status(), 0);
    assert_eq!(manager.session(), before);
}

#[rstest]
#[tokio::test]
async fn refresh_adopts_new_token_and_keeps_user(signed_in_store: Arc<InMemorySessionStore>) {
    let mut auth = MockAuthApi::new();
    auth.expect_refresh()
        .withf(|t| t.as_str() == "t1")
        .times(1)
        .return_once(|_| {
            Ok(RefreshGrant {
                token: token("t2"),
                user: None,
            })
        });
    let manager = signed_in(auth, &signed_in_store).await;

    let refreshed = manager.refresh_token().await.expect("refresh succeeds");

    assert_eq!(refreshed.as_str(), "t2");
    assert_eq!(manager.token(), Some(token("t2")));
    assert_eq!(manager.user(), Some(alice()));
    assert_eq!(stored(&signed_in_store, StorageKey::Token).as_deref(), Some("t2"));
    assert_eq!(stored(&signed_in_store, StorageKey::User).as_deref(), Some(ALICE_JSON));
}

#[rstest]
#[tokio::test]
async fn refresh_replaces_user_when_supplied(signed_in_store: Arc<InMemorySessionStore>) {
    let renamed = User::try_from_strings("1", "alice2").expect("valid user");
    let expected = renamed.clone();
    let mut auth = MockAuthApi::new();
    auth.expect_refresh().return_once(move |_| {
        Ok(RefreshGrant {
            token: token("t2"),
            user: Some(renamed),
        })
    });
    let manager = signed_in(auth, &signed_in_store).await;

    manager.refresh_token().await.expect("refresh succeeds");

    assert_eq!(manager.user(), Some(expected.clone()));
    let persisted: User =
        serde_json::from_str(&stored(&signed_in_store, StorageKey::User).expect("user stored"))
            .expect("stored user parses");
    assert_eq!(persisted, expected);
}

#[rstest]
#[tokio::test]
async fn refresh_failure_signs_out_then_reports(signed_in_store: Arc<InMemorySessionStore>) {
    let mut auth = MockAuthApi::new();
    let mut sequence = Sequence::new();
    auth.expect_refresh()
        .times(1)
        .in_sequence(&mut sequence)
        .return_once(|_| Err(ApiError::http(401, "Refresh token expired", "REFRESH_ERROR")));
    auth.expect_logout()
        .times(1)
        .in_sequence(&mut sequence)
        .return_once(|_| Ok(()));
    let manager = signed_in(auth, &signed_in_store).await;

    let err = manager.refresh_token().await.expect_err("must fail");

    assert_eq!(err.code(), "REFRESH_ERROR");
    assert!(!manager.is_authenticated());
    assert_eq!(stored(&signed_in_store, StorageKey::Token), None);
    assert_eq!(stored(&signed_in_store, StorageKey::User), None);
}

#[rstest]
#[tokio::test]
async fn refresh_prefers_token_rotated_in_storage(signed_in_store: Arc<InMemorySessionStore>) {
    let mut auth = MockAuthApi::new();
    auth.expect_refresh()
        .withf(|t| t.as_str() == "rotated")
        .times(1)
        .return_once(|_| {
            Ok(RefreshGrant {
                token: token("t3"),
                user: None,
            })
        });
    let manager = signed_in(auth, &signed_in_store).await;
    signed_in_store
        .set(StorageKey::Token, "rotated")
        .expect("rotate token");

    manager.refresh_token().await.expect("refresh succeeds");

    assert_eq!(manager.token(), Some(token("t3")));
}

#[rstest]
#[tokio::test]
async fn reload_user_replaces_profile(signed_in_store: Arc<InMemorySessionStore>) {
    let fresh = User::try_from_strings("1", "alice.b").expect("valid user");
    let expected = fresh.clone();
    let mut auth = MockAuthApi::new();
    auth.expect_current_user().times(1).return_once(move || Ok(fresh));
    let manager = signed_in(auth, &signed_in_store).await;

    let user = manager.reload_user().await.expect("reload succeeds");

    assert_eq!(user, expected);
    assert_eq!(manager.user(), Some(expected));
    assert!(manager.is_authenticated());
}

#[rstest]
#[tokio::test]
async fn concurrent_logout_and_refresh_end_signed_out(
    signed_in_store: Arc<InMemorySessionStore>,
) {
    let mut auth = MockAuthApi::new();
    auth.expect_refresh().times(0..=1).returning(|_| {
        Ok(RefreshGrant {
            token: token("t2"),
            user: None,
        })
    });
    auth.expect_logout().times(1).returning(|_| Ok(()));
    let manager = Arc::new(signed_in(auth, &signed_in_store).await);

    let refresher = Arc::clone(&manager);
    let (refresh, ()) = tokio::join!(
        async move { refresher.refresh_token().await },
        manager.logout()
    );

    if let Err(error) = refresh {
        assert_eq!(error.kind(), ErrorKind::NoToken, "refresh queued behind logout");
    }
    assert!(!manager.is_authenticated());
    assert_eq!(stored(&signed_in_store, StorageKey::Token), None);
}

#[rstest]
#[tokio::test]
async fn subscribers_see_published_sessions(signed_in_store: Arc<InMemorySessionStore>) {
    let mut auth = MockAuthApi::new();
    auth.expect_logout().return_once(|_| Ok(()));
    let manager = manager(auth, &signed_in_store);
    let mut updates = manager.subscribe();

    manager.initialize().await;
    assert!(updates.has_changed().expect("sender alive"));
    assert_eq!(updates.borrow_and_update().phase, SessionPhase::Authenticated);

    manager.logout().await;
    assert!(updates.has_changed().expect("sender alive"));
    assert_eq!(updates.borrow_and_update().phase, SessionPhase::Anonymous);
}

fn teardown_over(redirect: &Arc<RecordingRedirect>) -> SessionTeardown {
    SessionTeardown::new(Arc::clone(redirect) as Arc<dyn LoginRedirect>)
}

#[rstest]
#[tokio::test]
async fn teardown_signs_manager_out_and_forwards(signed_in_store: Arc<InMemorySessionStore>) {
    let redirect = Arc::new(RecordingRedirect::default());
    let teardown = teardown_over(&redirect);
    let manager = SessionManager::with_teardown(
        Arc::new(MockAuthApi::new()),
        Arc::clone(&signed_in_store) as Arc<dyn SessionStore>,
        &teardown,
    );
    manager.initialize().await;
    let mut updates = manager.subscribe();

    teardown.redirect_to_login("/login");

    assert!(!manager.is_authenticated());
    assert_eq!(manager.token(), None);
    assert_eq!(manager.phase(), SessionPhase::Anonymous);
    assert!(updates.has_changed().expect("sender alive"));
    assert_eq!(redirect.entries(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn teardown_before_initialize_leaves_restore_to_storage() {
    let redirect = Arc::new(RecordingRedirect::default());
    let teardown = teardown_over(&redirect);
    let store = Arc::new(InMemorySessionStore::new());
    let manager = SessionManager::with_teardown(
        Arc::new(MockAuthApi::new()),
        Arc::clone(&store) as Arc<dyn SessionStore>,
        &teardown,
    );

    teardown.redirect_to_login("/login");

    assert_eq!(manager.phase(), SessionPhase::Uninitialized);
    assert!(!manager.initialize().await.is_authenticated());
    assert_eq!(manager.phase(), SessionPhase::Anonymous);
}

#[rstest]
#[tokio::test]
async fn abandoned_pipeline_refresh_signs_manager_out(
    signed_in_store: Arc<InMemorySessionStore>,
) {
    let redirect = Arc::new(RecordingRedirect::default());
    let teardown = teardown_over(&redirect);
    let transport = ScriptedTransport::new()
        .reply(401, &json!({ "message": "Token expired" }))
        .reply(401, &json!({ "message": "Refresh token expired" }));
    let pipeline = HttpPipeline::new(
        Arc::new(transport),
        Arc::clone(&signed_in_store) as Arc<dyn SessionStore>,
        Arc::new(FixtureClock::default()),
    )
    .with_login_redirect(Arc::new(teardown.clone()), "/login");
    let manager = SessionManager::with_teardown(
        Arc::new(MockAuthApi::new()),
        Arc::clone(&signed_in_store) as Arc<dyn SessionStore>,
        &teardown,
    );
    manager.initialize().await;
    assert!(manager.is_authenticated());

    MovieService::new(Arc::new(pipeline))
        .list_movies(&MovieFilters::default())
        .await
        .expect_err("refresh rejection fails the request");

    assert!(!manager.is_authenticated());
    assert_eq!(manager.token(), None);
    assert_eq!(manager.user(), None);
    assert_eq!(stored(&signed_in_store, StorageKey::Token), None);
    assert_eq!(redirect.entries(), vec!["/login".to_owned()]);
}

#[tokio::test]
async fn adopt_persists_a_registration_grant() {
    let store = Arc::new(InMemorySessionStore::new());
    let manager = manager(MockAuthApi::new(), &store);
    manager.initialize().await;
    assert_eq!(manager.phase(), SessionPhase::Anonymous);

    let user = manager
        .adopt(LoginGrant {
            user: alice(),
            token: token("t9"),
        })
        .await
        .expect("adopt succeeds");

    assert_eq!(user, alice());
    assert!(manager.is_authenticated());
    assert_eq!(manager.phase(), SessionPhase::Authenticated);
    assert_eq!(stored(&store, StorageKey::Token).as_deref(), Some("t9"));
    assert_eq!(stored(&store, StorageKey::User).as_deref(), Some(ALICE_JSON));
}
