//! Ingest credential and identifier generation

use chrono::Utc;
use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;

const STREAM_KEY_LEN: usize = 32;
const SUFFIX_LEN: usize = 10;
const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Produces stream keys, session IDs and anonymous viewer IDs.
///
/// All randomness comes from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialGenerator;

impl CredentialGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Fixed-length alphanumeric ingest key
    pub fn stream_key(&self) -> String {
        Alphanumeric.sample_string(&mut rand::thread_rng(), STREAM_KEY_LEN)
    }

    /// `ls_<millis base36>_<random>`; the prefix sorts by creation time but
    /// nothing relies on that ordering
    pub fn session_id(&self) -> String {
        format!("ls_{}_{}", base36(Utc::now().timestamp_millis() as u64), self.suffix())
    }

    /// Pseudo-ID for a viewer who joined without an account
    pub fn anonymous_viewer_id(&self) -> String {
        format!("anon_{}", self.suffix())
    }

    fn suffix(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..SUFFIX_LEN)
            .map(|_| LOWER_ALNUM[rng.gen_range(0..LOWER_ALNUM.len())] as char)
            .collect()
    }
}

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(LOWER_ALNUM[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_stream_key_shape() {
        let key = CredentialGenerator::new().stream_key();
        assert_eq!(key.len(), STREAM_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_keys_do_not_collide() {
        let gen = CredentialGenerator::new();
        let keys: HashSet<String> = (0..10_000).map(|_| gen.stream_key()).collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_session_id_is_time_prefixed() {
        let id = CredentialGenerator::new().session_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ls");
        assert_eq!(parts[2].len(), SUFFIX_LEN);
    }

    #[test]
    fn test_base36() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }

    #[test]
    fn test_anonymous_viewer_prefix() {
        assert!(CredentialGenerator::new()
            .anonymous_viewer_id()
            .starts_with("anon_"));
    }
}
