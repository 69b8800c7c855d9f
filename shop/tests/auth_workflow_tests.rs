// shop/tests/auth_workflow_tests.rs

mod common;

use common::{seed_user, test_state, TEST_PASSWORD};
use instashop::errors::AppError;
use instashop::services::AuthService;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn login_issues_a_session_that_authenticates() {
  let state = test_state(true);
  let user = seed_user(&state, "ada@example.com", false).await;

  let session = state.auth.login(" Ada@Example.com ", TEST_PASSWORD).await.expect("login");
  assert_eq!(session.user_id, user.id);
  assert!(session.expires_at > session.created_at);

  let resolved = state.auth.authenticate(&session.token).await.expect("authenticated");
  assert_eq!(resolved.user_id, user.id);
}

#[tokio::test]
#[serial]
async fn expiry_beyond_the_calendar_is_an_internal_error() {
  let state = test_state(true);
  seed_user(&state, "ada@example.com", false).await;
  let auth = AuthService::new(state.flows.clone(), state.stores.clone(), chrono::Duration::MAX);

  let err = auth
    .login("ada@example.com", TEST_PASSWORD)
    .await
    .expect_err("expiry overflows");
  assert!(matches!(err, AppError::Internal(_)));
}

#[tokio::test]
#[serial]
async fn already_expired_session_is_rejected() {
  let state = test_state(true);
  seed_user(&state, "ada@example.com", false).await;
  let auth = AuthService::new(state.flows.clone(), state.stores.clone(), -chrono::Duration::minutes(5));

  let session = auth.login("ada@example.com", TEST_PASSWORD).await.expect("login");
  let err = auth.authenticate(&session.token).await.expect_err("expired");
  assert!(matches!(err, AppError::Auth(_)));
}
