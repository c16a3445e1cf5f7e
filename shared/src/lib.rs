//! Wire protocol shared between the Minesweeper server and its clients.
//!
//! Every message is a fixed-size record of big-endian integers sent over a
//! persistent TCP stream, one socket per client. The only variable-length
//! payloads (board and scoreboard) carry their own size up front, so a peer
//! always knows exactly how many bytes to read next.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};
use thiserror::Error;

/// Port the server listens on when none is given.
pub const DEFAULT_PORT: u16 = 1588;
/// Number of session workers the server starts by default.
pub const DEFAULT_WORKERS: usize = 10;
/// Default board width in tiles.
pub const DEFAULT_WIDTH: usize = 9;
/// Default board height in tiles.
pub const DEFAULT_HEIGHT: usize = 9;
/// Default number of bombs per game.
pub const DEFAULT_BOMBS: usize = 10;

/// Fixed width of the username field in the login record.
pub const USERNAME_LEN: usize = 64;
/// Fixed width of the password field in the login record.
pub const PASSWORD_LEN: usize = 64;

/// Board value for a tile the player has not touched yet.
pub const HIDDEN_VAL: u16 = 10;
/// Board value for a flagged tile.
pub const FLAG_VAL: u16 = 11;
/// Board value for a revealed bomb.
pub const BOMB_VAL: u16 = 12;

/// Login reply sent when credentials were accepted.
pub const LOGIN_ACCEPTED: i32 = 1;
/// Login reply sent right before the server closes a rejected connection.
pub const LOGIN_REJECTED: i32 = -1;

/// Errors produced while decoding records received from a peer.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("record too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unknown action tag {0}")]
    UnknownAction(u32),

    #[error("unknown reply tag {0}")]
    UnknownReply(u32),

    #[error("text field is not valid UTF-8")]
    BadText,

    #[error("payload declares an unreasonable size")]
    BadLength,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<WireError> for std::io::Error {
    fn from(err: WireError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
    }
}

/// What a client asks the server to do with one request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Action {
    QueryBoard = 0,
    QueryScoreboard = 1,
    Flag = 2,
    Reveal = 3,
    Quit = 4,
    Surrender = 5,
}

impl TryFrom<u32> for Action {
    type Error = WireError;

    fn try_from(tag: u32) -> Result<Self, WireError> {
        match tag {
            0 => Ok(Action::QueryBoard),
            1 => Ok(Action::QueryScoreboard),
            2 => Ok(Action::Flag),
            3 => Ok(Action::Reveal),
            4 => Ok(Action::Quit),
            5 => Ok(Action::Surrender),
            other => Err(WireError::UnknownAction(other)),
        }
    }
}

/// Status the server sends back for a gameplay request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Reply {
    Valid = 0,
    Invalid = 1,
    Won = 2,
    Lost = 3,
}

impl Reply {
    pub const SIZE: usize = 4;

    pub fn encode(self) -> [u8; Self::SIZE] {
        (self as u32).to_be_bytes()
    }
}

impl TryFrom<u32> for Reply {
    type Error = WireError;

    fn try_from(tag: u32) -> Result<Self, WireError> {
        match tag {
            0 => Ok(Reply::Valid),
            1 => Ok(Reply::Invalid),
            2 => Ok(Reply::Won),
            3 => Ok(Reply::Lost),
            other => Err(WireError::UnknownReply(other)),
        }
    }
}

/// The login record: two NUL-padded fixed-width text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub const SIZE: usize = USERNAME_LEN + PASSWORD_LEN;

    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        write_padded(&mut buf, &self.username, USERNAME_LEN);
        write_padded(&mut buf, &self.password, PASSWORD_LEN);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::SIZE {
            return Err(WireError::Truncated {
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self {
            username: read_padded(&buf[..USERNAME_LEN])?,
            password: read_padded(&buf[USERNAME_LEN..Self::SIZE])?,
        })
    }
}

/// One gameplay request: a coordinate pair and an action tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub x: i32,
    pub y: i32,
    pub action: Action,
}

impl Request {
    pub const SIZE: usize = 12;

    /// A request whose action ignores the coordinates.
    pub fn action_only(action: Action) -> Self {
        Self { x: 0, y: 0, action }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.x.to_be_bytes());
        buf[4..8].copy_from_slice(&self.y.to_be_bytes());
        buf[8..12].copy_from_slice(&(self.action as u32).to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < Self::SIZE {
            return Err(WireError::Truncated {
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }
        let mut cursor = Cursor::new(buf);
        let x = cursor.read_i32::<BigEndian>()?;
        let y = cursor.read_i32::<BigEndian>()?;
        let action = Action::try_from(cursor.read_u32::<BigEndian>()?)?;
        Ok(Self { x, y, action })
    }
}

/// Snapshot of a board as sent in reply to [`Action::QueryBoard`].
///
/// Tiles are row-major u16 values: an adjacency count 0-8, or one of
/// [`HIDDEN_VAL`], [`FLAG_VAL`], [`BOMB_VAL`]. A trailing counter carries the
/// number of un-flagged bombs as a display hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<u16>,
    pub bombs_remaining: u16,
}

impl BoardView {
    pub const HEADER_SIZE: usize = 8;

    /// Size of the record body that follows the two-int header.
    pub fn body_size(width: i32, height: i32) -> Result<usize, WireError> {
        if width <= 0 || height <= 0 || width > 1024 || height > 1024 {
            return Err(WireError::BadLength);
        }
        Ok((width as usize) * (height as usize) * 2 + 2)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let body = Self::body_size(self.width, self.height)?;
        let mut buf = Vec::with_capacity(Self::HEADER_SIZE + body);
        buf.write_i32::<BigEndian>(self.width)?;
        buf.write_i32::<BigEndian>(self.height)?;
        for value in &self.tiles {
            buf.write_u16::<BigEndian>(*value)?;
        }
        buf.write_u16::<BigEndian>(self.bombs_remaining)?;
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut cursor = Cursor::new(buf);
        let width = cursor.read_i32::<BigEndian>()?;
        let height = cursor.read_i32::<BigEndian>()?;
        let body = Self::body_size(width, height)?;
        if buf.len() < Self::HEADER_SIZE + body {
            return Err(WireError::Truncated {
                expected: Self::HEADER_SIZE + body,
                actual: buf.len(),
            });
        }
        let count = (width as usize) * (height as usize);
        let mut tiles = Vec::with_capacity(count);
        for _ in 0..count {
            tiles.push(cursor.read_u16::<BigEndian>()?);
        }
        let bombs_remaining = cursor.read_u16::<BigEndian>()?;
        Ok(Self {
            width,
            height,
            tiles,
            bombs_remaining,
        })
    }

    /// Tile value at (x, y), if in range.
    pub fn tile(&self, x: usize, y: usize) -> Option<u16> {
        if x < self.width as usize && y < self.height as usize {
            self.tiles.get(y * self.width as usize + x).copied()
        } else {
            None
        }
    }
}

/// One scoreboard line: a winning game plus the winner's running history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardRow {
    pub seconds_taken: i32,
    pub username: String,
    pub won: i32,
    pub lost: i32,
}

/// The full sorted scoreboard as sent in reply to [`Action::QueryScoreboard`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardView {
    pub rows: Vec<ScoreboardRow>,
}

impl ScoreboardView {
    pub const COUNT_SIZE: usize = 4;
    pub const ROW_SIZE: usize = 4 + USERNAME_LEN + 8;

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = Vec::with_capacity(Self::COUNT_SIZE + self.rows.len() * Self::ROW_SIZE);
        buf.write_i32::<BigEndian>(self.rows.len() as i32)?;
        for row in &self.rows {
            buf.write_i32::<BigEndian>(row.seconds_taken)?;
            write_padded(&mut buf, &row.username, USERNAME_LEN);
            buf.write_i32::<BigEndian>(row.won)?;
            buf.write_i32::<BigEndian>(row.lost)?;
        }
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let mut cursor = Cursor::new(buf);
        let count = cursor.read_i32::<BigEndian>()?;
        if count < 0 || count > 1_000_000 {
            return Err(WireError::BadLength);
        }
        let expected = Self::COUNT_SIZE + count as usize * Self::ROW_SIZE;
        if buf.len() < expected {
            return Err(WireError::Truncated {
                expected,
                actual: buf.len(),
            });
        }
        let mut rows = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let seconds_taken = cursor.read_i32::<BigEndian>()?;
            let mut name = [0u8; USERNAME_LEN];
            cursor.read_exact(&mut name)?;
            let username = read_padded(&name)?;
            let won = cursor.read_i32::<BigEndian>()?;
            let lost = cursor.read_i32::<BigEndian>()?;
            rows.push(ScoreboardRow {
                seconds_taken,
                username,
                won,
                lost,
            });
        }
        Ok(Self { rows })
    }
}

/// Writes `text` into `buf` as a NUL-padded field of exactly `len` bytes.
/// Longer text is truncated at a UTF-8 boundary.
fn write_padded(buf: &mut Vec<u8>, text: &str, len: usize) {
    let mut take = text.len().min(len);
    while !text.is_char_boundary(take) {
        take -= 1;
    }
    buf.extend_from_slice(&text.as_bytes()[..take]);
    buf.extend(std::iter::repeat(0).take(len - take));
}

/// Reads a NUL-padded field back into a string, stopping at the first NUL.
fn read_padded(buf: &[u8]) -> Result<String, WireError> {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end])
        .map(str::to_string)
        .map_err(|_| WireError::BadText)
}
