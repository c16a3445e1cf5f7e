//! # Minesweeper Session Server Library
//!
//! This library implements the concurrent session server for the multiplayer
//! Minesweeper service. Clients connect over TCP, authenticate once, and are
//! handed to a fixed pool of workers that each run one full session at a
//! time.
//!
//! ## Architecture
//!
//! The acceptor verifies credentials and pushes authenticated connections
//! onto a mutex-plus-signal FIFO. N long-lived workers block on that queue;
//! each dequeued connection becomes a [`session::Session`] that owns its
//! [`board::Board`] outright, so game state needs no locking. The only
//! shared structures are the scoreboard/history store and the logged-in
//! set, each behind its own lock, never nested and never held across
//! network I/O.
//!
//! ## Module Organization
//!
//! - [`board`]: the pure game rules, from bomb placement and first-click
//!   safety to flood-fill reveal and win/loss detection.
//! - [`queue`]: the producer/consumer handoff between acceptor and
//!   workers.
//! - [`session`]: the per-connection request loop and game lifecycle.
//! - [`registry`]: the shared scoreboard, user histories, and the
//!   duplicate-login guard.
//! - [`auth`]: the flat-file credential store consulted at login.
//! - [`network`]: the TCP acceptor, login handshake, and worker pool.

pub mod auth;
pub mod board;
pub mod network;
pub mod queue;
pub mod registry;
pub mod session;
