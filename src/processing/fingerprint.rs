//! Content fingerprints used by callers for identity and cache keys.

use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of the text's UTF-8 bytes.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let text = "You agree to binding arbitration.";
        assert_eq!(fingerprint(text), fingerprint(text));
    }

    #[test]
    fn fingerprint_is_fixed_length_lowercase_hex() {
        let digest = fingerprint("");
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let other = fingerprint("Terms of Service");
        assert_eq!(other.len(), 64);
        assert!(
            other
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn fingerprint_distinguishes_texts() {
        let corpus = ["Page one.", "Page one. ", "page one.", "Page two."];
        for (i, left) in corpus.iter().enumerate() {
            for right in corpus.iter().skip(i + 1) {
                assert_ne!(fingerprint(left), fingerprint(right));
            }
        }
    }
}
