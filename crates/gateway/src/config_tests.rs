// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::*;

fn parse(args: &[&str]) -> anyhow::Result<GatewayConfig> {
    let argv = std::iter::once("sessiongate").chain(args.iter().copied());
    Ok(GatewayConfig::try_parse_from(argv)?)
}

#[test]
fn defaults_match_backend_lifetimes() -> anyhow::Result<()> {
    let config = parse(&["--backend-url", "http://localhost:8000/api/"])?;

    assert_eq!(config.access_lifetime_secs, 2700);
    assert_eq!(config.refresh_lifetime_secs, 518_400);
    assert_eq!(config.backend_timeout(), Duration::from_secs(5));
    assert_eq!(config.resources, vec!["movies", "users"]);
    assert_eq!(config.federated_providers, vec!["google"]);
    assert_eq!(config.port, 9900);
    assert!(config.state_file.is_none());
    Ok(())
}

#[test]
fn missing_backend_url_is_a_config_error() -> anyhow::Result<()> {
    let mut config = parse(&[])?;
    config.backend_url = None;

    let err = config.backend_url().err();
    assert!(matches!(err, Some(GatewayError::Config(_))), "got {err:?}");

    config.backend_url = Some("   ".to_owned());
    assert!(matches!(config.backend_url(), Err(GatewayError::Config(_))));
    Ok(())
}

#[yare::parameterized(
    adds_trailing_slash = { "http://localhost:8000/api", "http://localhost:8000/api/" },
    keeps_trailing_slash = { "http://localhost:8000/api/", "http://localhost:8000/api/" },
    bare_host = { "https://backend.example.com", "https://backend.example.com/" },
    drops_query = { "http://localhost:8000/api/?debug=1", "http://localhost:8000/api/" },
)]
fn backend_url_is_normalized(input: &str, expected: &str) {
    let config = GatewayConfig::parse_from(["sessiongate", "--backend-url", input]);
    let url = config.backend_url().map(|u| u.to_string()).unwrap_or_default();
    assert_eq!(url, expected);
}

#[yare::parameterized(
    not_a_url = { "not a url" },
    wrong_scheme = { "ftp://backend.example.com/" },
    mailto = { "mailto:ops@example.com" },
)]
fn backend_url_rejects_invalid(input: &str) {
    let config = GatewayConfig::parse_from(["sessiongate", "--backend-url", input]);
    assert!(matches!(config.backend_url(), Err(GatewayError::Config(_))));
}

#[test]
fn repeatable_lists_accept_commas() -> anyhow::Result<()> {
    let config = parse(&[
        "--backend-url",
        "http://localhost:8000/api/",
        "--resource",
        "movies,reviews",
        "--federated-provider",
        "google",
        "--federated-provider",
        "github",
    ])?;

    assert_eq!(config.resources, vec!["movies", "reviews"]);
    assert_eq!(config.federated_providers, vec!["google", "github"]);
    Ok(())
}

#[test]
fn lifetimes_follow_flags() -> anyhow::Result<()> {
    let config = parse(&[
        "--backend-url",
        "http://localhost:8000/api/",
        "--access-lifetime-secs",
        "60",
        "--refresh-lifetime-secs",
        "600",
    ])?;

    let lifetimes = config.lifetimes();
    assert_eq!(lifetimes.access, Duration::from_secs(60));
    assert_eq!(lifetimes.refresh, Duration::from_secs(600));
    Ok(())
}
