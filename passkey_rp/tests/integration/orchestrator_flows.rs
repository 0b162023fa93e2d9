use std::time::Duration;

use passkey_rp::{CeremonyOutcome, ClientError, PlatformError};

use crate::common::TestRp;

fn success(username: &str) -> CeremonyOutcome {
    CeremonyOutcome::Success {
        username: username.to_string(),
    }
}

#[tokio::test]
async fn test_orchestrated_register_and_sign_in() {
    let t = TestRp::in_memory();
    let client = t.orchestrator("browser");

    assert_eq!(client.register("alice").await, success("alice"));
    assert_eq!(client.authenticate(Some("alice")).await, success("alice"));
    assert_eq!(client.authenticate(None).await, success("alice"));
}

#[tokio::test]
async fn test_manual_sign_in_supersedes_autofill() {
    let t = TestRp::in_memory();
    let client = t.orchestrator("browser");
    client.register("alice").await;

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.authenticate_autofill().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());

    assert_eq!(client.authenticate(Some("alice")).await, success("alice"));
    assert_eq!(pending.await.unwrap(), CeremonyOutcome::Aborted);
}

#[tokio::test]
async fn test_unknown_user_surfaces_server_message() {
    let t = TestRp::in_memory();
    let client = t.orchestrator("browser");

    let outcome = client.authenticate(Some("bob")).await;
    assert_eq!(
        outcome,
        CeremonyOutcome::Failed(ClientError::Server("User does not exist".to_string()))
    );
    if let CeremonyOutcome::Failed(err) = outcome {
        assert_eq!(err.user_message(), "User does not exist");
    }
}

#[tokio::test]
async fn test_dismissed_prompt_is_not_a_failure() {
    let t = TestRp::in_memory();
    let client = t.orchestrator("browser");
    client.register("alice").await;

    t.authenticator.fail_next(PlatformError::NotAllowed).await;
    assert_eq!(
        client.authenticate(Some("alice")).await,
        CeremonyOutcome::UserCancelled
    );
    // The next attempt starts from a fresh challenge.
    assert_eq!(client.authenticate(Some("alice")).await, success("alice"));
}
