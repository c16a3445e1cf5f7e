//! Scripted protocol client for poking a running server by hand:
//! logs in, reveals a tile, prints the board and the scoreboard, quits.

use shared::{
    Action, BoardView, Credentials, Reply, Request, ScoreboardView, BOMB_VAL, FLAG_VAL, HIDDEN_VAL,
    LOGIN_ACCEPTED,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr = args
        .next()
        .unwrap_or_else(|| format!("127.0.0.1:{}", shared::DEFAULT_PORT));
    let username = args.next().unwrap_or_else(|| "tester".to_string());
    let password = args.next().unwrap_or_else(|| "tester".to_string());

    println!("Connecting to {addr} as {username}");
    let mut stream = TcpStream::connect(&addr).await?;

    stream
        .write_all(&Credentials::new(&username, &password).encode())
        .await?;
    let status = stream.read_i32().await?;
    if status != LOGIN_ACCEPTED {
        println!("Login rejected");
        return Ok(());
    }
    println!("Login accepted");

    print_board(&mut stream).await?;

    let reveal = Request {
        x: 4,
        y: 4,
        action: Action::Reveal,
    };
    stream.write_all(&reveal.encode()).await?;
    let reply = Reply::try_from(stream.read_u32().await?)?;
    println!("Reveal (4, 4) -> {reply:?}");

    print_board(&mut stream).await?;
    print_scoreboard(&mut stream).await?;

    stream
        .write_all(&Request::action_only(Action::Quit).encode())
        .await?;
    Ok(())
}

async fn print_board(stream: &mut TcpStream) -> Result<(), Box<dyn std::error::Error>> {
    stream
        .write_all(&Request::action_only(Action::QueryBoard).encode())
        .await?;

    let width = stream.read_i32().await?;
    let height = stream.read_i32().await?;
    let body = BoardView::body_size(width, height)?;
    let mut rest = vec![0u8; body];
    stream.read_exact(&mut rest).await?;

    let mut bytes = Vec::with_capacity(BoardView::HEADER_SIZE + body);
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&rest);
    let view = BoardView::decode(&bytes)?;

    println!("Board {width}x{height}, {} bombs remaining:", view.bombs_remaining);
    for y in 0..height as usize {
        let mut line = String::new();
        for x in 0..width as usize {
            let glyph = match view.tile(x, y) {
                Some(HIDDEN_VAL) => "#".to_string(),
                Some(FLAG_VAL) => "F".to_string(),
                Some(BOMB_VAL) => "*".to_string(),
                Some(0) => ".".to_string(),
                Some(n) => n.to_string(),
                None => "?".to_string(),
            };
            line.push_str(&glyph);
            line.push(' ');
        }
        println!("  {line}");
    }
    Ok(())
}

async fn print_scoreboard(stream: &mut TcpStream) -> Result<(), Box<dyn std::error::Error>> {
    stream
        .write_all(&Request::action_only(Action::QueryScoreboard).encode())
        .await?;

    let count = stream.read_i32().await?;
    let mut rest = vec![0u8; count.max(0) as usize * ScoreboardView::ROW_SIZE];
    stream.read_exact(&mut rest).await?;

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&count.to_be_bytes());
    bytes.extend_from_slice(&rest);
    let view = ScoreboardView::decode(&bytes)?;

    println!("Scoreboard ({count} wins):");
    for row in &view.rows {
        println!(
            "  {:>4}s  {}  won {} lost {}",
            row.seconds_taken, row.username, row.won, row.lost
        );
    }
    Ok(())
}
