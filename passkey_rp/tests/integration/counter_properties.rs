use passkey_rp::{CeremonyError, SessionId, SoftAuthenticator};
use proptest::prelude::*;

use crate::common::{ORIGIN, TestRp};

/// Stored counter after presenting `received` against `stored`, or `None`
/// if the assertion must be rejected.
fn expected_counter(stored: u32, received: u32) -> Option<u32> {
    if received > stored || (stored == 0 && received == 0) {
        Some(received)
    } else {
        None
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// The stored counter never decreases and accepted assertions always
    /// carry a counter above it, unless the authenticator has none.
    #[test]
    fn test_counter_is_monotonic(counters in proptest::collection::vec(0u32..12, 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            // Step 0: each assertion carries exactly the rewound value.
            let t = TestRp::in_memory_with(SoftAuthenticator::new(ORIGIN).with_counter_step(0));
            let session = SessionId::new("s1");
            t.register(&session, "alice").await.unwrap();

            let mut stored = 0;
            for received in counters {
                t.authenticator.rewind_counters(received).await;
                let result = t.authenticate(&session, Some("alice")).await;

                match expected_counter(stored, received) {
                    Some(next) => {
                        assert!(result.unwrap().verified);
                        stored = next;
                    }
                    None => {
                        assert!(matches!(result, Err(CeremonyError::VerificationFailed(_))));
                    }
                }
                assert_eq!(t.stored_counter("alice").await, stored);
            }
        });
    }
}
