//! Credential verification against a flat file.
//!
//! The store is loaded once at startup and consulted through a single
//! `verify` call per connection; its on-disk format is not part of the
//! protocol contract. When the operator supplies no file the server runs
//! open, accepting any credentials, which mirrors the development setup.

use log::warn;
use std::collections::HashMap;
use std::io;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CredentialStore {
    /// `None` means every login is accepted.
    users: Option<HashMap<String, String>>,
}

impl CredentialStore {
    /// A store that accepts any username/password pair.
    pub fn allow_all() -> Self {
        Self { users: None }
    }

    /// Loads `username password` pairs, one per line, whitespace separated.
    /// Blank lines and `#` comments are skipped; malformed lines are logged
    /// and ignored.
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut users = HashMap::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(username), Some(password)) => {
                    users.insert(username.to_string(), password.to_string());
                }
                _ => warn!("skipping malformed credentials line {}", number + 1),
            }
        }
        Self { users: Some(users) }
    }

    /// The single verification entry point used by the acceptor.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        if username.is_empty() {
            return false;
        }
        match &self.users {
            None => true,
            Some(users) => users.get(username).map(String::as_str) == Some(password),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_skips_noise() {
        let store = CredentialStore::parse(
            "# registered players\n\
             alice secret\n\
             \n\
             bob hunter2 trailing junk\n\
             loner\n",
        );
        assert!(store.verify("alice", "secret"));
        assert!(store.verify("bob", "hunter2"));
        assert!(!store.verify("loner", ""));
    }

    #[test]
    fn rejects_wrong_password_and_unknown_user() {
        let store = CredentialStore::parse("alice secret");
        assert!(!store.verify("alice", "wrong"));
        assert!(!store.verify("mallory", "secret"));
    }

    #[test]
    fn allow_all_still_requires_a_username() {
        let store = CredentialStore::allow_all();
        assert!(store.verify("anyone", "anything"));
        assert!(!store.verify("", "anything"));
    }
}
