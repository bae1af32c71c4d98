//! End-to-end account lifecycle over the wired backend.
//!
//! These tests build [`Backend`] with process-local storage and drive it the
//! way the binary does, so the settings, hashing, token and repository
//! adapters are all exercised together.

use std::sync::Arc;

use mockable::Clock;
use pagination::PageParams;
use research_backend::domain::{Credentials, ErrorCode, SignInStatus, SignUpRequest};
use research_backend::settings::{
    AuthSettings, DatabaseSettings, HashingSettings, PaginationSettings, Settings,
};
use research_backend::test_support::{MutableClock, RecordingNotifier};
use research_backend::{Backend, Storage};
use rstest::{fixture, rstest};

const PASSWORD: &str = "secret123";

struct World {
    backend: Backend,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<MutableClock>,
}

fn settings() -> Settings {
    Settings {
        auth: AuthSettings {
            secret: Some("integration-secret".to_owned()),
            allow_ephemeral_secret: false,
            issuer: None,
            app_url: Some("https://research.example.com".to_owned()),
            session_ttl_secs: Some(600),
            reset_ttl_secs: Some(3600),
        },
        pagination: PaginationSettings {
            min_items: None,
            max_items: None,
        },
        hashing: HashingSettings {
            memory_kib: Some(1024),
            iterations: Some(1),
            parallelism: Some(1),
        },
        database: DatabaseSettings::default(),
    }
}

#[fixture]
fn world() -> World {
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(MutableClock::fixed());
    let backend = Backend::build(
        settings(),
        &Storage::Memory,
        Arc::clone(&notifier) as _,
        Arc::clone(&clock) as Arc<dyn Clock>,
    )
    .expect("backend builds");
    World {
        backend,
        notifier,
        clock,
    }
}

impl World {
    async fn sign_up(&self, first: &str, last: &str, email: &str) {
        let request =
            SignUpRequest::try_from_parts(first, last, email, PASSWORD, None).expect("request");
        let outcome = self.backend.auth.sign_up(request).await.expect("sign-up");
        assert!(outcome.email_dispatched);
    }

    async fn sign_in(&self, email: &str, password: &str) -> SignInStatus {
        let credentials = Credentials::try_from_parts(email, password).expect("credentials");
        self.backend
            .auth
            .authentication(&credentials)
            .await
            .expect("sign-in completes")
            .status
    }

    fn token(&self, template: &str) -> String {
        self.notifier.last_token(template).expect("token emailed")
    }
}

#[rstest]
#[tokio::test]
async fn verified_account_can_sign_in_and_open_a_session(world: World) {
    world.sign_up("Ada", "Lovelace", "ada@example.com").await;
    assert_eq!(
        world.sign_in("ada@example.com", PASSWORD).await,
        SignInStatus::Unverified
    );

    let token = world.token("account_verification");
    let verified = world
        .backend
        .auth
        .account_verification(&token)
        .await
        .expect("verification succeeds");
    assert!(verified.is_verified());

    let credentials = Credentials::try_from_parts("ada@example.com", PASSWORD).expect("creds");
    let outcome = world
        .backend
        .auth
        .authentication(&credentials)
        .await
        .expect("sign-in completes");
    let session = outcome.token.expect("session token");
    let user = world
        .backend
        .auth
        .check_authentication(&session)
        .await
        .expect("session is valid");
    assert_eq!(user.email().as_ref(), "ada@example.com");
}

#[rstest]
#[tokio::test]
async fn verification_links_are_single_use(world: World) {
    world.sign_up("Ada", "Lovelace", "ada@example.com").await;
    let token = world.token("account_verification");
    world
        .backend
        .auth
        .account_verification(&token)
        .await
        .expect("first verification");

    let err = world
        .backend
        .auth
        .account_verification(&token)
        .await
        .expect_err("second verification");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn duplicate_emails_are_refused(world: World) {
    world.sign_up("Ada", "Lovelace", "ada@example.com").await;
    let request = SignUpRequest::try_from_parts("Ada", "Byron", "ada@example.com", PASSWORD, None)
        .expect("request");

    let err = world
        .backend
        .auth
        .sign_up(request)
        .await
        .expect_err("duplicate email");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn sessions_expire_with_the_configured_lifetime(world: World) {
    world.sign_up("Ada", "Lovelace", "ada@example.com").await;
    let verification = world.token("account_verification");
    world
        .backend
        .auth
        .account_verification(&verification)
        .await
        .expect("verified");
    let credentials = Credentials::try_from_parts("ada@example.com", PASSWORD).expect("creds");
    let session = world
        .backend
        .auth
        .authentication(&credentials)
        .await
        .expect("sign-in")
        .token
        .expect("session token");

    world.clock.advance_seconds(601);
    let err = world
        .backend
        .auth
        .check_authentication(&session)
        .await
        .expect_err("expired session");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(err.sub_code(), Some("token_expired"));
}

#[rstest]
#[tokio::test]
async fn password_reset_replaces_the_password_once(world: World) {
    world.sign_up("Ada", "Lovelace", "ada@example.com").await;
    let verification = world.token("account_verification");
    world
        .backend
        .auth
        .account_verification(&verification)
        .await
        .expect("verified");

    let outcome = world
        .backend
        .auth
        .send_password_reset_link("ada@example.com")
        .await
        .expect("reset requested");
    assert!(outcome.email_dispatched);
    let reset = world.token("password_reset");

    world.clock.advance_seconds(1);
    world
        .backend
        .auth
        .update_password(&reset, "brand-new-pass")
        .await
        .expect("password updated");
    assert_eq!(
        world.sign_in("ada@example.com", PASSWORD).await,
        SignInStatus::Invalid
    );
    assert_eq!(
        world.sign_in("ada@example.com", "brand-new-pass").await,
        SignInStatus::Authenticated
    );

    let err = world
        .backend
        .auth
        .update_password(&reset, "another-pass")
        .await
        .expect_err("reset link reused");
    assert_eq!(err.sub_code(), Some("reset_link_already_used"));
}

#[rstest]
#[tokio::test]
async fn search_finds_accounts_by_name_prefix(world: World) {
    world.sign_up("Ada", "Lovelace", "ada@example.com").await;
    world.sign_up("Grace", "Hopper", "grace@example.com").await;
    world.sign_up("Alan", "Turing", "alan@example.com").await;

    let hits = world
        .backend
        .auth
        .search("a", &PageParams::new(None, None, Some("firstName")))
        .await
        .expect("search succeeds");
    let names: Vec<_> = hits.data.iter().map(|doc| doc.first_name.as_str()).collect();
    assert_eq!(names, ["Ada", "Alan"]);
    assert_eq!(hits.pagination.total_items, 2);
}

#[rstest]
#[tokio::test]
async fn search_rejects_unknown_sort_fields(world: World) {
    let err = world
        .backend
        .auth
        .search("", &PageParams::new(None, None, Some("email")))
        .await
        .expect_err("unknown sort field");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(err.field_errors().is_some_and(|fields| fields.contains_key("sort")));
}
