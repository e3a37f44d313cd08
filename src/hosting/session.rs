use crate::Identity;
use crate::SESSION_DURATION;

/// Persisted login session. The raw token is handed to the client once
/// at mint time and never stored; lookups go through its digest.
#[derive(Debug, Clone)]
pub struct Session {
    account: Identity,
    hash: Vec<u8>,
    expires: std::time::SystemTime,
}

impl Session {
    /// Issue a fresh session for `account`. Returns the session to
    /// persist and the raw bearer token to hand back to the client.
    pub fn mint(account: Identity) -> (Self, String) {
        let token = uuid::Uuid::now_v7().to_string();
        let session = Self {
            account,
            hash: Self::digest(&token),
            expires: std::time::SystemTime::now() + SESSION_DURATION,
        };
        (session, token)
    }
    /// Rebuild a session from its stored columns.
    pub fn restore(account: Identity, hash: Vec<u8>, expires: std::time::SystemTime) -> Self {
        Self {
            account,
            hash,
            expires,
        }
    }
    pub fn digest(token: &str) -> Vec<u8> {
        use sha2::Digest;
        sha2::Sha256::digest(token.as_bytes()).to_vec()
    }
    pub fn account(&self) -> &Identity {
        &self.account
    }
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
    pub fn expires_at(&self) -> std::time::SystemTime {
        self.expires
    }
    pub fn expired(&self, now: std::time::SystemTime) -> bool {
        now >= self.expires
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_hashes_the_token() {
        let (session, token) = Session::mint(String::from("alice"));
        assert_eq!(session.hash(), Session::digest(&token).as_slice());
        assert_eq!(session.account(), "alice");
    }

    #[test]
    fn tokens_are_unique() {
        let (_, first) = Session::mint(String::from("alice"));
        let (_, second) = Session::mint(String::from("alice"));
        assert_ne!(first, second);
    }

    #[test]
    fn fresh_session_is_not_expired() {
        let (session, _) = Session::mint(String::from("alice"));
        assert!(!session.expired(std::time::SystemTime::now()));
        assert!(session.expired(std::time::SystemTime::now() + SESSION_DURATION * 2));
    }
}
