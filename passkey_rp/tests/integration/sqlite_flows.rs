use passkey_rp::{CeremonyError, SessionId};

use crate::common::TestRp;

#[tokio::test]
async fn test_sqlite_register_and_authenticate() {
    let t = TestRp::sqlite().await;
    let session = SessionId::new("s1");

    assert!(t.register(&session, "alice").await.unwrap().verified);
    let verdict = t.authenticate(&session, Some("alice")).await.unwrap();
    assert_eq!(verdict.username, "alice");
    let verdict = t.authenticate(&session, None).await.unwrap();
    assert_eq!(verdict.username, "alice");
    assert_eq!(t.stored_counter("alice").await, 2);

    let alice = t.repository.find_by_username("alice").await.unwrap().unwrap();
    let credential = &alice.credentials[0];
    assert!(
        credential
            .transports
            .iter()
            .any(|transport| transport.as_str() == "internal")
    );
    assert!(credential.last_used_at >= credential.created_at);
}

#[tokio::test]
async fn test_sqlite_rejects_replayed_counter() {
    let t = TestRp::sqlite().await;
    let session = SessionId::new("s1");
    t.register(&session, "alice").await.unwrap();
    t.authenticate(&session, Some("alice")).await.unwrap();
    t.authenticate(&session, Some("alice")).await.unwrap();

    t.authenticator.rewind_counters(0).await;
    let err = t.authenticate(&session, Some("alice")).await.unwrap_err();
    assert!(matches!(err, CeremonyError::VerificationFailed(_)));
    assert_eq!(t.stored_counter("alice").await, 2);
}

#[tokio::test]
async fn test_sqlite_unknown_user() {
    let t = TestRp::sqlite().await;
    let err = t
        .rp
        .authentication
        .generate_options(&SessionId::new("s1"), Some("bob"))
        .await
        .unwrap_err();
    assert_eq!(err, CeremonyError::UserNotFound);
}
