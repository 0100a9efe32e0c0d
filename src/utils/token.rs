use rand::{distributions::Alphanumeric, thread_rng, Rng, RngCore};

/// Interview access token length.
pub const ACCESS_TOKEN_LEN: usize = 32;
/// Self-service management token length.
pub const MANAGEMENT_TOKEN_LEN: usize = 48;

pub fn generate_access_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// 32 random bytes, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_expected_shape() {
        let t = generate_access_token(ACCESS_TOKEN_LEN);
        assert_eq!(t.len(), ACCESS_TOKEN_LEN);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(t, generate_access_token(ACCESS_TOKEN_LEN));

        let r = generate_reset_token();
        assert_eq!(r.len(), 64);
        assert!(r.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
