// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    rate_limited = { PlatformError::RateLimited { retry_after_s: Some(30) }, true },
    network = { PlatformError::Network("reset".into()), true },
    server_error = { PlatformError::Api { status: 502, message: "bad gateway".into() }, true },
    not_found = { PlatformError::Api { status: 404, message: "missing".into() }, false },
    unprocessable = { PlatformError::Api { status: 422, message: "validation".into() }, false },
    auth = { PlatformError::Auth("bad key".into()), false },
)]
fn transient_classification(error: PlatformError, expected: bool) {
    assert_eq!(error.is_transient(), expected);
}

#[test]
fn rate_limit_message_includes_delay() {
    let err = PlatformError::RateLimited { retry_after_s: Some(30) };
    assert!(err.to_string().contains("30s"));
    let bare = PlatformError::RateLimited { retry_after_s: None };
    assert_eq!(bare.to_string(), "rate limited");
}

#[tokio::test]
async fn fake_records_calls_in_order() {
    let platform = FakePlatform::new();
    platform.get_repository("acme", "proj").await.unwrap();
    platform.get_reference("acme", "proj", "heads/main").await.unwrap();
    let calls = platform.calls();
    assert_eq!(calls[0].operation, "GetRepository");
    assert_eq!(calls[1].operation, "GetReference");
}

#[tokio::test]
async fn fake_replays_scripted_failures() {
    let platform = FakePlatform::new();
    platform.push_failure(PlatformError::Api { status: 500, message: "flake".into() });
    assert!(platform.get_repository("acme", "proj").await.is_err());
    // Next call succeeds.
    assert!(platform.get_repository("acme", "proj").await.is_ok());
}

#[tokio::test]
async fn fake_pull_request_lifecycle() {
    let platform = FakePlatform::new();
    let pr = platform
        .create_pull_request(
            "acme",
            "proj",
            NewPullRequest {
                title: "fix: counter drift".into(),
                body: "automated change".into(),
                head: "mend/issue-42".into(),
                base: "main".into(),
                draft: true,
            },
        )
        .await
        .unwrap();
    assert!(pr.draft);
    assert_eq!(pr.number, 1);

    let updated = platform
        .update_pull_request("acme", "proj", pr.number, Some("fix: counter".into()), None)
        .await
        .unwrap();
    assert_eq!(updated.title, "fix: counter");

    let listed = platform.list_pull_requests("acme", "proj", Some("mend/issue-42")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(platform.list_pull_requests("acme", "proj", Some("other")).await.unwrap().is_empty());
}

#[tokio::test]
async fn fake_comments_are_recorded() {
    let platform = FakePlatform::new();
    platform.create_issue_comment("acme", "proj", 42, "opened a draft PR").await.unwrap();
    assert_eq!(platform.comments(), vec![(42, "opened a draft PR".to_string())]);
}

#[tokio::test]
async fn fake_token_is_scoped_to_installation() {
    let platform = FakePlatform::new();
    assert_eq!(platform.installation_token(7).await.unwrap(), "token-7");
}
