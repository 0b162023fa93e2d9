use std::sync::Arc;

use passkey_rp::SessionId;

use crate::common::TestRp;

/// Two verifications of the same credential racing on different sessions
/// leave exactly one stored credential.
#[tokio::test]
async fn test_concurrent_registration_stores_one_credential() {
    let t = Arc::new(TestRp::in_memory());
    let (s1, s2) = (SessionId::new("s1"), SessionId::new("s2"));

    let response = t.create(&s1, "alice").await;
    let challenge = t
        .rp
        .registration
        .generate_options(&s2, "alice")
        .await
        .unwrap()
        .challenge;
    let replay = t
        .authenticator
        .resign_registration(&response, &challenge)
        .unwrap();

    let (first, second) = tokio::join!(
        t.rp.registration.verify(&s1, "alice", &response),
        t.rp.registration.verify(&s2, "alice", &replay),
    );
    assert!(first.unwrap().verified);
    assert!(second.unwrap().verified);

    let alice = t.repository.find_by_username("alice").await.unwrap().unwrap();
    assert_eq!(alice.credentials.len(), 1);
}

/// Concurrent first-time options requests for one name create one user.
#[tokio::test]
async fn test_concurrent_options_create_one_user() {
    let t = Arc::new(TestRp::in_memory());

    let mut handles = Vec::new();
    for i in 0..8 {
        let t = t.clone();
        handles.push(tokio::spawn(async move {
            t.rp
                .registration
                .generate_options(&SessionId::new(&format!("s{i}")), "alice")
                .await
                .map(|options| options.user.id)
        }));
    }

    let mut user_ids = Vec::new();
    for handle in handles {
        user_ids.push(handle.await.unwrap().unwrap());
    }
    user_ids.dedup();
    assert_eq!(user_ids.len(), 1);
}

/// Only one of several verifications racing for the same challenge wins.
#[tokio::test]
async fn test_challenge_consumed_once_under_contention() {
    let t = Arc::new(TestRp::in_memory());
    let session = SessionId::new("s1");
    t.register(&session, "alice").await.unwrap();
    let assertion = t.assert(&session, Some("alice")).await;

    let mut handles = Vec::new();
    for _ in 0..4 {
        let (t, session, assertion) = (t.clone(), session.clone(), assertion.clone());
        handles.push(tokio::spawn(async move {
            t.rp
                .authentication
                .verify(&session, Some("alice"), &assertion)
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
