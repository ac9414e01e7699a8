// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::clock::ManualClock;
use crate::error::NON_FIELD_ERRORS;
use crate::test_support::{unreachable_url, MockBackend};

const NOW: u64 = 1_700_000_000;

fn authenticator(base: &str) -> anyhow::Result<Authenticator> {
    let backend = BackendClient::new(reqwest::Url::parse(base)?, Duration::from_secs(2))?;
    Ok(Authenticator::new(
        backend,
        Arc::new(ManualClock::new(NOW)),
        TokenLifetimes::default(),
        vec!["google".into()],
    ))
}

fn password(identifier: &str, secret: &str) -> Credentials {
    Credentials::Password { identifier: identifier.into(), secret: secret.into() }
}

#[tokio::test]
async fn password_login_issues_session() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let session = auth.authenticate(&password("a@b.com", "pw")).await?;
    assert_eq!(session.access_token(), "A1");
    assert_eq!(session.refresh_token(), "R1");
    assert_eq!(session.user_id().as_str(), "1");
    assert_eq!(session.user()["email"], "a@b.com");
    assert_eq!(session.provider(), &Provider::Credentials);
    assert_eq!(session.access_expires_at(), NOW + 2700);
    assert_eq!(session.refresh_expires_at(), NOW + 518_400);
    assert_eq!(mock.login_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn each_login_gets_a_distinct_session_id() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let first = auth.authenticate(&password("a@b.com", "pw")).await?;
    let second = auth.authenticate(&password("a@b.com", "pw")).await?;
    assert_ne!(first.id(), second.id());
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let err = auth.authenticate(&password("a@b.com", "wrong")).await.err();
    let Some(err) = err else { anyhow::bail!("expected login to fail") };
    assert!(matches!(err, GatewayError::InvalidCredentials { .. }), "got {err:?}");

    let fields = err.field_errors();
    assert_eq!(
        fields.get(NON_FIELD_ERRORS).map(Vec::as_slice),
        Some(&["Unable to log in with provided credentials.".to_owned()][..])
    );
    Ok(())
}

#[tokio::test]
async fn federated_exchange_issues_session() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let creds = Credentials::Federated { provider: "google".into(), assertion: "id-token".into() };
    let session = auth.authenticate(&creds).await?;
    assert_eq!(session.provider(), &Provider::Federated { name: "google".into() });
    assert_eq!(session.user_id().as_str(), "2");
    Ok(())
}

#[tokio::test]
async fn rejected_assertion_is_invalid_credentials() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let creds =
        Credentials::Federated { provider: "google".into(), assertion: "bad-assertion".into() };
    let err = auth.authenticate(&creds).await.err();
    assert!(matches!(err, Some(GatewayError::InvalidCredentials { .. })), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn unknown_provider_never_reaches_backend() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let creds = Credentials::Federated { provider: "myspace".into(), assertion: "x".into() };
    let err = auth.authenticate(&creds).await.err();
    assert!(matches!(err, Some(GatewayError::UnknownProvider(ref p)) if p == "myspace"));
    assert_eq!(mock.login_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_is_retryable() -> anyhow::Result<()> {
    let auth = authenticator(&unreachable_url().await?)?;

    let err = auth.authenticate(&password("a@b.com", "pw")).await.err();
    assert!(matches!(err, Some(GatewayError::BackendUnavailable(_))), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn register_passes_through() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let reg = Registration {
        username: "neo".into(),
        email: "neo@example.com".into(),
        password: "pw".into(),
        password_confirm: "pw".into(),
    };
    let answer = auth.register(&reg).await?;
    assert_eq!(answer.status, 201);
    assert_eq!(answer.body["user"]["username"], "neo");
    assert_eq!(mock.login_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn register_mismatch_is_validation_error() -> anyhow::Result<()> {
    let mock = MockBackend::start().await?;
    let auth = authenticator(&mock.url())?;

    let reg = Registration {
        username: "neo".into(),
        email: "neo@example.com".into(),
        password: "pw".into(),
        password_confirm: "other".into(),
    };
    let err = auth.register(&reg).await.err();
    let Some(err) = err else { anyhow::bail!("expected registration to fail") };
    assert_eq!(err.http_status(), 400);
    assert_eq!(
        err.field_errors().get("password").map(Vec::as_slice),
        Some(&["Passwords do not match.".to_owned()][..])
    );
    Ok(())
}

#[test]
fn debug_output_redacts_secrets() {
    let creds = password("a@b.com", "hunter2");
    let shown = format!("{creds:?}");
    assert!(shown.contains("a@b.com"));
    assert!(!shown.contains("hunter2"));

    let reg = Registration {
        username: "neo".into(),
        email: "neo@example.com".into(),
        password: "hunter2".into(),
        password_confirm: "hunter2".into(),
    };
    assert!(!format!("{reg:?}").contains("hunter2"));
}
