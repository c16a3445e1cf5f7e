use clap::Parser;
use server::auth::CredentialStore;
use server::board::BoardParams;
use server::network::{Server, ServerConfig};
use std::path::PathBuf;

/// Parses command-line arguments, loads the credential store and runs the
/// session server until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value_t = shared::DEFAULT_PORT)]
        port: u16,
        /// Number of session workers (bounds simultaneous games)
        #[clap(short, long, default_value_t = shared::DEFAULT_WORKERS)]
        workers: usize,
        /// Board width in tiles
        #[clap(long, default_value_t = shared::DEFAULT_WIDTH)]
        width: usize,
        /// Board height in tiles
        #[clap(long, default_value_t = shared::DEFAULT_HEIGHT)]
        height: usize,
        /// Bombs per game
        #[clap(long, default_value_t = shared::DEFAULT_BOMBS)]
        bombs: usize,
        /// Credential file (username password per line); omit to accept
        /// any login
        #[clap(short, long)]
        credentials: Option<PathBuf>,
    }

    env_logger::init();
    let args = Args::parse();

    let board = BoardParams {
        width: args.width,
        height: args.height,
        bombs: args.bombs,
    };
    if !board.is_valid() {
        return Err(format!(
            "{} bombs do not fit a {}x{} board",
            args.bombs, args.width, args.height
        )
        .into());
    }
    if args.workers == 0 {
        return Err("at least one worker is required".into());
    }

    let credentials = match &args.credentials {
        Some(path) => CredentialStore::load(path)?,
        None => {
            log::warn!("no credential file given; accepting any login");
            CredentialStore::allow_all()
        }
    };

    let config = ServerConfig {
        workers: args.workers,
        board,
    };
    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, config, credentials).await?;
    server.run().await?;

    Ok(())
}
