//! Shared per-server state: the scoreboard with per-user histories, and the
//! set of currently logged-in users.
//!
//! Each structure encapsulates its own lock and is handed to workers as an
//! `Arc`. The two locks are never held at the same time, and no lock is
//! held across network I/O; sessions take snapshots and serialize them
//! after the lock is gone.

use log::debug;
use shared::ScoreboardRow;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// Cumulative win/loss record for one username. Created lazily on the
/// first completed game, never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserHistory {
    pub won: u32,
    pub lost: u32,
}

/// One completed winning game.
#[derive(Debug, Clone)]
struct ScoreboardEntry {
    username: String,
    seconds_taken: i32,
}

#[derive(Debug, Default)]
struct ScoreboardState {
    histories: HashMap<String, UserHistory>,
    entries: Vec<ScoreboardEntry>,
}

impl ScoreboardState {
    fn history_mut(&mut self, username: &str) -> &mut UserHistory {
        self.histories.entry(username.to_string()).or_default()
    }

    /// Stable re-sort of the whole entry list. Primary key is completion
    /// time descending (the reference ordering, kept as-is even though it
    /// ranks slow wins first), then the winner's current win count
    /// descending, then username ascending case-insensitively.
    fn resort(&mut self) {
        let histories = &self.histories;
        let wins = |entry: &ScoreboardEntry| {
            histories.get(&entry.username).map(|h| h.won).unwrap_or(0)
        };
        self.entries.sort_by(|a, b| {
            b.seconds_taken
                .cmp(&a.seconds_taken)
                .then_with(|| wins(b).cmp(&wins(a)))
                .then_with(|| {
                    a.username
                        .to_lowercase()
                        .cmp(&b.username.to_lowercase())
                })
        });
    }
}

/// The server-wide scoreboard. All mutation and iteration happens under
/// one internal lock.
#[derive(Debug, Default)]
pub struct Scoreboard {
    inner: Mutex<ScoreboardState>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a win: bumps the user's history, appends a scoreboard entry
    /// and re-sorts the list, all under a single lock acquisition.
    pub async fn record_win(&self, username: &str, seconds_taken: i32) {
        let mut state = self.inner.lock().await;
        state.history_mut(username).won += 1;
        state.entries.push(ScoreboardEntry {
            username: username.to_string(),
            seconds_taken,
        });
        state.resort();
        debug!("recorded win for {username} ({seconds_taken}s)");
    }

    /// Records a loss. Losses never appear on the scoreboard itself; they
    /// only feed the user's history.
    pub async fn record_loss(&self, username: &str) {
        let mut state = self.inner.lock().await;
        state.history_mut(username).lost += 1;
        debug!("recorded loss for {username}");
    }

    /// Sorted scoreboard rows joined with each winner's current history,
    /// ready for serialization outside the lock.
    pub async fn snapshot(&self) -> Vec<ScoreboardRow> {
        let state = self.inner.lock().await;
        state
            .entries
            .iter()
            .map(|entry| {
                let history = state
                    .histories
                    .get(&entry.username)
                    .cloned()
                    .unwrap_or_default();
                ScoreboardRow {
                    seconds_taken: entry.seconds_taken,
                    username: entry.username.clone(),
                    won: history.won as i32,
                    lost: history.lost as i32,
                }
            })
            .collect()
    }

    /// History lookup, mainly for tests and diagnostics.
    pub async fn history(&self, username: &str) -> Option<UserHistory> {
        self.inner.lock().await.histories.get(username).cloned()
    }
}

/// Usernames that currently hold an active session. Guarded by its own
/// lock, which is never taken while the scoreboard lock is held.
#[derive(Debug, Default)]
pub struct LoginRegistry {
    users: Mutex<HashSet<String>>,
}

impl LoginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the username for a new session. Fails if a session for it is
    /// already running; the caller reports that as an authentication
    /// failure.
    pub async fn try_login(&self, username: &str) -> bool {
        self.users.lock().await.insert(username.to_string())
    }

    /// Releases the username. Called exactly once per successful login,
    /// including when the connection dropped mid-game.
    pub async fn logout(&self, username: &str) {
        self.users.lock().await.remove(username);
    }

    pub async fn is_logged_in(&self, username: &str) -> bool {
        self.users.lock().await.contains(username)
    }
}
