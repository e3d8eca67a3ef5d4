//! HMAC-SHA256 webhook signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the lowercase-hex signature of the raw request body
pub const SIGNATURE_HEADER: &str = "X-TV-Signature";

/// Verifies webhook bodies against a shared secret.
///
/// An empty secret disables verification: every body is accepted.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifier that accepts everything
    pub fn disabled() -> Self {
        Self { secret: Vec::new() }
    }

    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Lowercase-hex HMAC-SHA256 of `body`
    pub fn sign(&self, body: &[u8]) -> String {
        // HMAC accepts keys of any length, including empty
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC can take key of any size");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Check `signature` against the expected digest in constant time.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let expected = self.sign(body);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.is_enabled())
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"bot":"b","symbol":"AAPL","side":"buy","qty":"1"}"#;

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let verifier = SignatureVerifier::new("Jefe");
        assert_eq!(
            verifier.sign(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_valid_signature() {
        let verifier = SignatureVerifier::new("s");
        let sig = verifier.sign(BODY);
        assert_eq!(sig.len(), 64);
        assert!(verifier.verify(BODY, &sig));
    }

    #[test]
    fn test_single_char_mutation_fails() {
        let verifier = SignatureVerifier::new("s");
        let sig = verifier.sign(BODY);

        for i in 0..sig.len() {
            let mut mutated = sig.clone().into_bytes();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(!verifier.verify(BODY, &mutated), "mutation at {i} accepted");
        }
    }

    #[test]
    fn test_uppercase_hex_rejected() {
        let verifier = SignatureVerifier::new("s");
        let sig = verifier.sign(BODY).to_uppercase();
        assert!(!verifier.verify(BODY, &sig));
    }

    #[test]
    fn test_garbage_and_truncated_signatures() {
        let verifier = SignatureVerifier::new("s");
        let sig = verifier.sign(BODY);
        assert!(!verifier.verify(BODY, "bad"));
        assert!(!verifier.verify(BODY, ""));
        assert!(!verifier.verify(BODY, &sig[..63]));
        assert!(!verifier.verify(BODY, "zz-not-hex-at-all-\u{1F600}"));
    }

    #[test]
    fn test_body_mutation_fails() {
        let verifier = SignatureVerifier::new("s");
        let sig = verifier.sign(BODY);
        assert!(!verifier.verify(b"{\"bot\":\"c\"}", &sig));
    }

    #[test]
    fn test_disabled_accepts_anything() {
        let verifier = SignatureVerifier::disabled();
        assert!(!verifier.is_enabled());
        assert!(verifier.verify(BODY, "anything"));
        assert!(verifier.verify(BODY, ""));

        let empty = SignatureVerifier::new("");
        assert!(!empty.is_enabled());
        assert!(empty.verify(b"test", "whatever"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let verifier = SignatureVerifier::new("hunter2");
        let out = format!("{:?}", verifier);
        assert!(!out.contains("hunter2"));
        assert!(out.contains("enabled: true"));
    }
}
