// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use super::*;

fn user(pk: u64) -> anyhow::Result<UserId> {
    UserId::from_user(&json!({ "pk": pk })).ok_or_else(|| anyhow::anyhow!("no user id"))
}

#[test]
fn invalidate_without_subscribers_is_fine() -> anyhow::Result<()> {
    let inv = Invalidator::default();
    assert_eq!(inv.invalidate("movies", &user(1)?).seq, 1);
    assert_eq!(inv.invalidate("movies", &user(1)?).seq, 2);
    Ok(())
}

#[test]
fn every_subscriber_sees_each_signal_once() -> anyhow::Result<()> {
    let inv = Invalidator::new(8);
    let mut a = inv.subscribe();
    let mut b = inv.subscribe();

    inv.invalidate("movies", &user(1)?);

    let seen = a.try_recv()?;
    assert_eq!(seen.collection, "movies");
    assert_eq!(seen.owner, user(1)?);
    assert_eq!(b.try_recv()?.collection, "movies");
    assert!(matches!(a.try_recv(), Err(TryRecvError::Empty)));
    Ok(())
}

#[test]
fn slow_subscriber_lags() -> anyhow::Result<()> {
    let inv = Invalidator::new(2);
    let mut rx = inv.subscribe();
    for _ in 0..5 {
        inv.invalidate("movies", &user(1)?);
    }
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(3))));
    Ok(())
}

#[yare::parameterized(
    none = { None, "reviews", true },
    empty = { Some(""), "reviews", true },
    all = { Some("all"), "reviews", true },
    listed = { Some("movies, users"), "users", true },
    unlisted = { Some("movies,users"), "reviews", false },
)]
fn filter_matches(spec: Option<&str>, collection: &str, expected: bool) {
    assert_eq!(CollectionFilter::parse(spec).wants(collection), expected);
}

#[test]
fn feed_wire_format() -> anyhow::Result<()> {
    let msg =
        FeedMessage::from(Invalidation { collection: "movies".into(), owner: user(7)?, seq: 4 });
    assert_eq!(
        serde_json::to_value(&msg)?,
        json!({ "event": "invalidate", "collection": "movies", "seq": 4 })
    );
    assert_eq!(
        serde_json::to_value(FeedMessage::Resync { missed: 2 })?,
        json!({ "event": "resync", "missed": 2 })
    );
    Ok(())
}
