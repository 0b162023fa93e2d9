use passkey_rp::{CeremonyError, SessionId};

use crate::common::TestRp;

/// Alice registers a passkey, then signs in both by name and through the
/// identifier-less flow.
#[tokio::test]
async fn test_alice_registers_and_signs_in() {
    let t = TestRp::in_memory();
    let session = SessionId::new("alice-browser");

    let verdict = t.register(&session, "alice").await.unwrap();
    assert!(verdict.verified);
    assert_eq!(t.stored_counter("alice").await, 0);

    let verdict = t.authenticate(&session, Some("alice")).await.unwrap();
    assert!(verdict.verified);
    assert_eq!(verdict.username, "alice");
    assert_eq!(t.stored_counter("alice").await, 1);

    let verdict = t.authenticate(&session, None).await.unwrap();
    assert!(verdict.verified);
    assert_eq!(verdict.username, "alice");
    assert_eq!(t.stored_counter("alice").await, 2);
}

/// Bob never registered: no challenge is issued for him.
#[tokio::test]
async fn test_unknown_user_gets_no_challenge() {
    let t = TestRp::in_memory();
    let session = SessionId::new("bob-browser");

    let err = t
        .rp
        .authentication
        .generate_options(&session, Some("bob"))
        .await
        .unwrap_err();
    assert_eq!(err, CeremonyError::UserNotFound);
    assert_eq!(err.to_string(), "User does not exist");
    assert!(t.challenges.consume(&session).await.unwrap().is_none());
}

#[tokio::test]
async fn test_challenge_is_single_use() {
    let t = TestRp::in_memory();
    let session = SessionId::new("s1");
    let response = t.create(&session, "alice").await;

    t.rp
        .registration
        .verify(&session, "alice", &response)
        .await
        .unwrap();
    let err = t
        .rp
        .registration
        .verify(&session, "alice", &response)
        .await
        .unwrap_err();
    assert_eq!(err, CeremonyError::ChallengeMissing);

    let assertion = t.assert(&session, Some("alice")).await;
    t.rp
        .authentication
        .verify(&session, Some("alice"), &assertion)
        .await
        .unwrap();
    let err = t
        .rp
        .authentication
        .verify(&session, Some("alice"), &assertion)
        .await
        .unwrap_err();
    assert_eq!(err, CeremonyError::ChallengeMissing);
}

#[tokio::test]
async fn test_verify_without_options_is_challenge_missing() {
    let t = TestRp::in_memory();
    let session = SessionId::new("s1");
    t.register(&session, "alice").await.unwrap();

    let assertion = t.assert(&session, Some("alice")).await;
    let err = t
        .rp
        .authentication
        .verify(&SessionId::new("another-browser"), Some("alice"), &assertion)
        .await
        .unwrap_err();
    assert_eq!(err, CeremonyError::ChallengeMissing);
}

#[tokio::test]
async fn test_challenge_is_bound_to_its_session() {
    let t = TestRp::in_memory();
    let (s1, s2) = (SessionId::new("s1"), SessionId::new("s2"));
    t.register(&s1, "alice").await.unwrap();

    // Options for s2 do not make s1's assertion acceptable on s2.
    let assertion = t.assert(&s1, Some("alice")).await;
    t.rp
        .authentication
        .generate_options(&s2, Some("alice"))
        .await
        .unwrap();
    let err = t
        .rp
        .authentication
        .verify(&s2, Some("alice"), &assertion)
        .await
        .unwrap_err();
    assert!(matches!(err, CeremonyError::VerificationFailed(_)));
}

#[tokio::test]
async fn test_reregistration_is_idempotent() {
    let t = TestRp::in_memory();
    let session = SessionId::new("s1");
    let response = t.create(&session, "alice").await;
    t.rp
        .registration
        .verify(&session, "alice", &response)
        .await
        .unwrap();

    let challenge = t
        .rp
        .registration
        .generate_options(&session, "alice")
        .await
        .unwrap()
        .challenge;
    let again = t
        .authenticator
        .resign_registration(&response, &challenge)
        .unwrap();
    let verdict = t
        .rp
        .registration
        .verify(&session, "alice", &again)
        .await
        .unwrap();
    assert!(verdict.verified);

    let alice = t.repository.find_by_username("alice").await.unwrap().unwrap();
    assert_eq!(alice.credentials.len(), 1);
}

#[tokio::test]
async fn test_identifierless_sign_in_resolves_owner() {
    let t = TestRp::in_memory();
    let session = SessionId::new("s1");
    t.register(&session, "alice").await.unwrap();
    t.register(&session, "carol").await.unwrap();

    // The authenticator offers its newest credential: carol's.
    let verdict = t.authenticate(&session, None).await.unwrap();
    assert_eq!(verdict.username, "carol");

    let verdict = t.authenticate(&session, Some("alice")).await.unwrap();
    assert_eq!(verdict.username, "alice");
}

#[tokio::test]
async fn test_assertion_for_other_user_is_rejected() {
    let t = TestRp::in_memory();
    let session = SessionId::new("s1");
    t.register(&session, "alice").await.unwrap();
    t.register(&session, "carol").await.unwrap();

    let assertion = t.assert(&session, None).await;
    let err = t
        .rp
        .authentication
        .verify(&session, Some("alice"), &assertion)
        .await
        .unwrap_err();
    assert_eq!(err, CeremonyError::CredentialNotRegistered);
}

#[tokio::test]
async fn test_blank_username_is_invalid_input() {
    let t = TestRp::in_memory();
    let err = t
        .rp
        .registration
        .generate_options(&SessionId::new("s1"), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, CeremonyError::InvalidInput(_)));
}
