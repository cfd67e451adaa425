//! Rate-limit key derivation.
//!
//! Client identities are hashed before they reach the store or a log line.

use sha2::{Digest, Sha256};

/// Prefix shared by every rate-limit counter in the store.
pub const KEY_PREFIX: &str = "ratelimit";

/// Hex-encoded SHA-256 of a raw client identity.
pub fn hash_identity(identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    hex::encode(hasher.finalize())
}

/// Store key for the counter of one (identity, method, route) triple.
pub fn rate_limit_key(identity: &str, method: &str, route: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        KEY_PREFIX,
        hash_identity(identity),
        method,
        route
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            hash_identity("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_key_layout() {
        let key = rate_limit_key("10.0.0.1", "GET", "/tasks");
        let hashed = hash_identity("10.0.0.1");

        assert_eq!(key, format!("ratelimit:{}:GET:/tasks", hashed));
        assert!(!key.contains("10.0.0.1"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_same_identity_same_key(identity in ".{0,64}", route in "/[a-z/]{0,16}") {
            prop_assert_eq!(
                rate_limit_key(&identity, "POST", &route),
                rate_limit_key(&identity, "POST", &route)
            );
        }

        #[test]
        fn prop_distinct_identities_distinct_keys(a in ".{0,64}", b in ".{0,64}") {
            prop_assume!(a != b);
            prop_assert_ne!(
                rate_limit_key(&a, "GET", "/tasks"),
                rate_limit_key(&b, "GET", "/tasks")
            );
        }

        #[test]
        fn prop_raw_identity_never_in_key(identity in "[0-9]{1,3}(\\.[0-9]{1,3}){3}") {
            let key = rate_limit_key(&identity, "GET", "/tasks");
            prop_assert!(!key.contains(&identity));
        }
    }
}
