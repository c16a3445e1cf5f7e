//! # Game Client Library
//!
//! Programmatic client for the Minesweeper session server. It owns one TCP
//! connection, performs the login handshake, and exposes one call per
//! protocol action. There is no interactive loop or rendering here; this
//! crate exists for tools and tests that need to speak the protocol.

use log::debug;
use shared::{
    Action, BoardView, Credentials, Reply, Request, ScoreboardView, WireError, LOGIN_ACCEPTED,
    LOGIN_REJECTED,
};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server rejected the login")]
    LoginRejected,

    #[error("unexpected login status {0}")]
    BadLoginStatus(i32),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One authenticated connection to the server.
#[derive(Debug)]
pub struct GameClient {
    stream: TcpStream,
}

impl GameClient {
    /// Connects and logs in. On rejection the server closes the socket and
    /// this returns [`ClientError::LoginRejected`].
    pub async fn connect(
        addr: impl ToSocketAddrs,
        username: &str,
        password: &str,
    ) -> Result<Self, ClientError> {
        let mut stream = TcpStream::connect(addr).await?;
        stream
            .write_all(&Credentials::new(username, password).encode())
            .await?;
        match stream.read_i32().await? {
            LOGIN_ACCEPTED => {
                debug!("logged in as {username}");
                Ok(Self { stream })
            }
            LOGIN_REJECTED => Err(ClientError::LoginRejected),
            other => Err(ClientError::BadLoginStatus(other)),
        }
    }

    /// Asks the server to reveal (x, y).
    pub async fn reveal(&mut self, x: i32, y: i32) -> Result<Reply, ClientError> {
        self.round_trip(Request {
            x,
            y,
            action: Action::Reveal,
        })
        .await
    }

    /// Toggles the flag on (x, y).
    pub async fn flag(&mut self, x: i32, y: i32) -> Result<Reply, ClientError> {
        self.round_trip(Request {
            x,
            y,
            action: Action::Flag,
        })
        .await
    }

    /// Gives up the current game; the server records a loss and deals a
    /// fresh board.
    pub async fn surrender(&mut self) -> Result<Reply, ClientError> {
        self.round_trip(Request::action_only(Action::Surrender)).await
    }

    /// Fetches the current board.
    pub async fn query_board(&mut self) -> Result<BoardView, ClientError> {
        self.send(Request::action_only(Action::QueryBoard)).await?;

        let width = self.stream.read_i32().await?;
        let height = self.stream.read_i32().await?;
        let body = BoardView::body_size(width, height)?;
        let mut rest = vec![0u8; body];
        self.stream.read_exact(&mut rest).await?;

        let mut bytes = Vec::with_capacity(BoardView::HEADER_SIZE + body);
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&rest);
        Ok(BoardView::decode(&bytes)?)
    }

    /// Fetches the sorted scoreboard with user histories.
    pub async fn query_scoreboard(&mut self) -> Result<ScoreboardView, ClientError> {
        self.send(Request::action_only(Action::QueryScoreboard))
            .await?;

        let count = self.stream.read_i32().await?;
        if count < 0 {
            return Err(ClientError::Wire(WireError::BadLength));
        }
        let mut rest = vec![0u8; count as usize * ScoreboardView::ROW_SIZE];
        self.stream.read_exact(&mut rest).await?;

        let mut bytes = Vec::with_capacity(ScoreboardView::COUNT_SIZE + rest.len());
        bytes.extend_from_slice(&count.to_be_bytes());
        bytes.extend_from_slice(&rest);
        Ok(ScoreboardView::decode(&bytes)?)
    }

    /// Ends the session. The server sends no reply to a quit.
    pub async fn quit(mut self) -> Result<(), ClientError> {
        self.send(Request::action_only(Action::Quit)).await?;
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn send(&mut self, request: Request) -> Result<(), ClientError> {
        self.stream.write_all(&request.encode()).await?;
        Ok(())
    }

    async fn round_trip(&mut self, request: Request) -> Result<Reply, ClientError> {
        self.send(request).await?;
        let tag = self.stream.read_u32().await?;
        Ok(Reply::try_from(tag)?)
    }
}
