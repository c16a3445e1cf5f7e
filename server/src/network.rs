//! TCP acceptor and the fixed worker pool that runs sessions.
//!
//! The acceptor performs the login handshake, then hands the connection to
//! the queue; one of N long-lived workers picks it up and drives the whole
//! session. The pool size bounds the number of simultaneous games, not the
//! number of users waiting in the queue.

use crate::auth::CredentialStore;
use crate::board::BoardParams;
use crate::queue::{ConnectionQueue, ConnectionRequest};
use crate::registry::{LoginRegistry, Scoreboard};
use crate::session::Session;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Credentials, LOGIN_ACCEPTED, LOGIN_REJECTED};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Server-wide tunables.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub workers: usize,
    pub board: BoardParams,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            workers: shared::DEFAULT_WORKERS,
            board: BoardParams::default(),
        }
    }
}

/// The session server: one acceptor plus a fixed pool of session workers
/// sharing the scoreboard and the logged-in set.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    credentials: CredentialStore,
    queue: Arc<ConnectionQueue<ConnectionRequest>>,
    scoreboard: Arc<Scoreboard>,
    logins: Arc<LoginRegistry>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        config: ServerConfig,
        credentials: CredentialStore,
    ) -> io::Result<Self> {
        assert!(config.workers > 0, "worker pool cannot be empty");
        assert!(
            config.board.is_valid(),
            "bomb count must stay below the tile count"
        );
        let listener = TcpListener::bind(addr).await?;
        info!("server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            config,
            credentials,
            queue: Arc::new(ConnectionQueue::new()),
            scoreboard: Arc::new(Scoreboard::new()),
            logins: Arc::new(LoginRegistry::new()),
        })
    }

    /// Address the listener actually bound, for callers that asked for
    /// port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the worker pool and runs the accept loop forever.
    pub async fn run(self) -> io::Result<()> {
        for worker_id in 0..self.config.workers {
            let queue = Arc::clone(&self.queue);
            let scoreboard = Arc::clone(&self.scoreboard);
            let logins = Arc::clone(&self.logins);
            let board = self.config.board;
            tokio::spawn(async move {
                worker_loop(worker_id, queue, scoreboard, logins, board).await;
            });
        }
        info!("started {} session workers", self.config.workers);

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!("accept failed: {err}");
                    continue;
                }
            };
            match self.login(stream, addr).await {
                Ok(Some(request)) => {
                    info!("{} @ {} added to the queue", request.username, addr);
                    self.queue.push(request).await;
                }
                Ok(None) => {}
                Err(err) => warn!("login handshake with {addr} failed: {err}"),
            }
        }
    }

    /// Runs the login handshake on a fresh connection. `Ok(None)` means the
    /// client was rejected and the connection closed.
    async fn login(
        &self,
        mut stream: TcpStream,
        addr: SocketAddr,
    ) -> io::Result<Option<ConnectionRequest>> {
        let mut buf = [0u8; Credentials::SIZE];
        stream.read_exact(&mut buf).await?;
        let credentials = match Credentials::decode(&buf) {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!("unreadable login record from {addr}: {err}");
                return reject(stream).await.map(|_| None);
            }
        };

        if !self
            .credentials
            .verify(&credentials.username, &credentials.password)
        {
            info!("rejected credentials for {} @ {addr}", credentials.username);
            return reject(stream).await.map(|_| None);
        }

        // Claim the username before answering; a second session for the
        // same user is an authentication failure.
        if !self.logins.try_login(&credentials.username).await {
            info!(
                "rejected duplicate login for {} @ {addr}",
                credentials.username
            );
            return reject(stream).await.map(|_| None);
        }

        if let Err(err) = stream.write_i32(LOGIN_ACCEPTED).await {
            // The peer vanished between connect and reply; give the name
            // back so they can retry.
            self.logins.logout(&credentials.username).await;
            return Err(err);
        }

        Ok(Some(ConnectionRequest {
            stream,
            username: credentials.username,
        }))
    }
}

async fn reject(mut stream: TcpStream) -> io::Result<()> {
    stream.write_i32(LOGIN_REJECTED).await?;
    stream.shutdown().await
}

/// One worker: dequeue, run the session to completion, release the login,
/// repeat forever.
async fn worker_loop(
    worker_id: usize,
    queue: Arc<ConnectionQueue<ConnectionRequest>>,
    scoreboard: Arc<Scoreboard>,
    logins: Arc<LoginRegistry>,
    board: BoardParams,
) {
    loop {
        let request = queue.pop().await;
        let username = request.username.clone();
        info!("{} now playing in game room #{}", username, worker_id + 1);

        let mut session = Session::new(
            request.stream,
            request.username,
            board,
            Arc::clone(&scoreboard),
            StdRng::from_entropy(),
        );
        if let Err(err) = session.run().await {
            warn!("session for {username} ended: {err}");
        }

        logins.logout(&username).await;
        info!("game room #{} is free again", worker_id + 1);
    }
}
