//! One authenticated connection playing games to completion.
//!
//! A session owns its board outright and processes requests strictly in
//! arrival order. Game completions are reported to the shared scoreboard;
//! the scoreboard lock is released before anything is written back to the
//! socket.

use crate::board::{Board, BoardParams, RevealOutcome};
use crate::registry::Scoreboard;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use shared::{Action, BoardView, Reply, Request};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub struct Session<S> {
    stream: S,
    username: String,
    params: BoardParams,
    scoreboard: Arc<Scoreboard>,
    rng: StdRng,
    board: Board,
    /// Armed by the first board query of the current game; elapsed time is
    /// measured from that moment so idle time before the first look does
    /// not count.
    game_started: Option<Instant>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub fn new(
        stream: S,
        username: String,
        params: BoardParams,
        scoreboard: Arc<Scoreboard>,
        mut rng: StdRng,
    ) -> Self {
        let board = Board::new(params, &mut rng);
        Self {
            stream,
            username,
            params,
            scoreboard,
            rng,
            board,
            game_started: None,
        }
    }

    /// Processes requests until the client quits (`Ok`) or the transport
    /// fails (`Err`). A malformed request only costs an `Invalid` reply.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut buf = [0u8; Request::SIZE];
        loop {
            self.stream.read_exact(&mut buf).await?;
            let request = match Request::decode(&buf) {
                Ok(request) => request,
                Err(err) => {
                    warn!("bad request from {}: {}", self.username, err);
                    self.send_reply(Reply::Invalid).await?;
                    continue;
                }
            };
            debug!("{} -> {:?}", self.username, request);

            match request.action {
                Action::Quit => {
                    info!("{} quit", self.username);
                    return Ok(());
                }
                Action::QueryBoard => self.send_board().await?,
                Action::QueryScoreboard => self.send_scoreboard().await?,
                Action::Reveal => self.handle_reveal(request.x, request.y).await?,
                Action::Flag => self.handle_flag(request.x, request.y).await?,
                Action::Surrender => self.handle_surrender().await?,
            }
        }
    }

    async fn handle_reveal(&mut self, x: i32, y: i32) -> io::Result<()> {
        if !self.board.in_bounds(x, y) {
            return self.send_reply(Reply::Invalid).await;
        }
        let (x, y) = (x as usize, y as usize);
        if self.board.is_revealed(x, y) || self.board.is_flagged(x, y) {
            return self.send_reply(Reply::Invalid).await;
        }
        match self.board.reveal(x, y) {
            RevealOutcome::Continue => self.send_reply(Reply::Valid).await,
            RevealOutcome::Won => self.finish_won().await,
            RevealOutcome::Lost => self.finish_lost(Reply::Lost).await,
        }
    }

    async fn handle_flag(&mut self, x: i32, y: i32) -> io::Result<()> {
        if !self.board.in_bounds(x, y) {
            return self.send_reply(Reply::Invalid).await;
        }
        let (x, y) = (x as usize, y as usize);
        if self.board.is_revealed(x, y) {
            return self.send_reply(Reply::Invalid).await;
        }
        match self.board.toggle_flag(x, y) {
            RevealOutcome::Won => self.finish_won().await,
            _ => self.send_reply(Reply::Valid).await,
        }
    }

    /// Surrender counts as a loss and deals a fresh board, but the lost
    /// board is never shown to the client.
    async fn handle_surrender(&mut self) -> io::Result<()> {
        self.finish_lost(Reply::Valid).await
    }

    async fn finish_won(&mut self) -> io::Result<()> {
        let seconds = self.elapsed_seconds();
        info!("{} won in {}s", self.username, seconds);
        self.scoreboard.record_win(&self.username, seconds).await;
        self.new_game();
        self.send_reply(Reply::Won).await
    }

    async fn finish_lost(&mut self, reply: Reply) -> io::Result<()> {
        info!("{} lost", self.username);
        self.scoreboard.record_loss(&self.username).await;
        self.new_game();
        self.send_reply(reply).await
    }

    fn elapsed_seconds(&self) -> i32 {
        self.game_started
            .map(|started| started.elapsed().as_secs().min(i32::MAX as u64) as i32)
            .unwrap_or(0)
    }

    fn new_game(&mut self) {
        self.board = Board::new(self.params, &mut self.rng);
        self.game_started = None;
    }

    async fn send_reply(&mut self, reply: Reply) -> io::Result<()> {
        self.stream.write_all(&reply.encode()).await
    }

    async fn send_board(&mut self) -> io::Result<()> {
        if self.game_started.is_none() {
            self.game_started = Some(Instant::now());
        }
        let view = BoardView {
            width: self.board.width() as i32,
            height: self.board.height() as i32,
            tiles: self.board.tile_values(),
            bombs_remaining: self.board.bombs_remaining().min(u16::MAX as usize) as u16,
        };
        let bytes = view.encode()?;
        self.stream.write_all(&bytes).await
    }

    async fn send_scoreboard(&mut self) -> io::Result<()> {
        let rows = self.scoreboard.snapshot().await;
        let bytes = shared::ScoreboardView { rows }.encode()?;
        self.stream.write_all(&bytes).await
    }
}
