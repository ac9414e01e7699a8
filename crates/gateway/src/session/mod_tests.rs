// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

const NOW: u64 = 1_700_000_000;

fn issued() -> Session {
    Session::issue(
        SessionId::from("s-1"),
        UserId::from_user(&json!({ "pk": 1 })).unwrap_or_else(|| UserId("1".into())),
        json!({ "pk": 1, "email": "a@b.com" }),
        Provider::Credentials,
        "A1".into(),
        "R1".into(),
        NOW,
        &TokenLifetimes::default(),
    )
}

#[test]
fn issue_computes_both_expiries() {
    let session = issued();
    assert_eq!(session.access_token(), "A1");
    assert_eq!(session.refresh_token(), "R1");
    assert_eq!(session.access_expires_at(), NOW + 2700);
    assert_eq!(session.refresh_expires_at(), NOW + 518_400);
}

#[test]
fn access_expiry_boundary_is_exclusive() {
    let session = issued();
    assert!(!session.is_access_expired(NOW));
    assert!(!session.is_access_expired(NOW + 2699));
    assert!(session.is_access_expired(NOW + 2700));
}

#[test]
fn rotate_without_new_refresh_keeps_refresh_expiry() {
    let mut session = issued();
    let lifetimes = TokenLifetimes::default();
    session.rotate("A2".into(), None, NOW + 3000, &lifetimes);

    assert_eq!(session.access_token(), "A2");
    assert_eq!(session.access_expires_at(), NOW + 3000 + 2700);
    assert_eq!(session.refresh_token(), "R1");
    assert_eq!(session.refresh_expires_at(), NOW + 518_400);
}

#[test]
fn rotate_with_new_refresh_resets_refresh_expiry() {
    let mut session = issued();
    let lifetimes = TokenLifetimes::default();
    session.rotate("A2".into(), Some("R2".into()), NOW + 3000, &lifetimes);

    assert_eq!(session.refresh_token(), "R2");
    assert_eq!(session.refresh_expires_at(), NOW + 3000 + 518_400);
}

#[test]
fn empty_refresh_token_cannot_refresh() {
    let session = Session::issue(
        SessionId::from("s-2"),
        UserId("7".into()),
        json!({}),
        Provider::Credentials,
        "A".into(),
        String::new(),
        NOW,
        &TokenLifetimes::default(),
    );
    assert!(session.is_refresh_expired(NOW));
}

#[test]
fn user_id_from_pk_or_id() {
    assert_eq!(UserId::from_user(&json!({ "pk": 42 })).map(|u| u.0), Some("42".to_owned()));
    assert_eq!(UserId::from_user(&json!({ "id": "u-9" })).map(|u| u.0), Some("u-9".to_owned()));
    assert!(UserId::from_user(&json!({ "email": "a@b.com" })).is_none());
    assert!(UserId::from_user(&json!({ "id": null })).is_none());
}

#[test]
fn info_and_debug_hide_tokens() -> anyhow::Result<()> {
    let session = issued();
    let info = serde_json::to_string(&session.info())?;
    assert!(!info.contains("A1"));
    assert!(!info.contains("R1"));

    let debug = format!("{session:?}");
    assert!(!debug.contains("A1"));
    assert!(!debug.contains("R1"));
    Ok(())
}

#[test]
fn provider_wire_format() -> anyhow::Result<()> {
    assert_eq!(serde_json::to_value(Provider::Credentials)?, json!({ "kind": "credentials" }));
    assert_eq!(
        serde_json::to_value(Provider::Federated { name: "google".into() })?,
        json!({ "kind": "federated", "name": "google" })
    );
    Ok(())
}
