use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEX_LEN: usize = 32;

/// Signature carried by a scheduling link. Binds the record id to the
/// candidate's email so a link cannot be replayed for another record.
pub fn scheduling_signature(secret: &str, candidate_id: &str, email: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(candidate_id.as_bytes());
    mac.update(b":");
    mac.update(email.trim().to_lowercase().as_bytes());
    let mut sig = hex::encode(mac.finalize().into_bytes());
    sig.truncate(SIGNATURE_HEX_LEN);
    Some(sig)
}

pub fn verify_scheduling_signature(
    secret: &str,
    candidate_id: &str,
    email: &str,
    provided: &str,
) -> bool {
    let Some(expected) = scheduling_signature(secret, candidate_id, email) else {
        return false;
    };
    let provided = provided.trim().to_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Constant-time equality for shared secrets such as webhook headers.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let sig = scheduling_signature("k", "rec1", "Jo@Example.com").unwrap();
        assert_eq!(sig.len(), SIGNATURE_HEX_LEN);
        assert!(verify_scheduling_signature("k", "rec1", "jo@example.com", &sig));
        assert!(verify_scheduling_signature("k", "rec1", "jo@example.com", &sig.to_uppercase()));
    }

    #[test]
    fn tampering_is_rejected() {
        let sig = scheduling_signature("k", "rec1", "jo@example.com").unwrap();
        assert!(!verify_scheduling_signature("k", "rec2", "jo@example.com", &sig));
        assert!(!verify_scheduling_signature("k", "rec1", "eve@example.com", &sig));
        assert!(!verify_scheduling_signature("other", "rec1", "jo@example.com", &sig));
        assert!(!verify_scheduling_signature("k", "rec1", "jo@example.com", &sig[..10]));
    }

    #[test]
    fn secret_comparison() {
        assert!(secrets_match("whsec", "whsec"));
        assert!(!secrets_match("whsec", "whsec2"));
    }
}
