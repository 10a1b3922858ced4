//! Interactive terminal client for the Agora chat.
//!
//! Joins the channel under the given username, prints the roster, history
//! and live traffic, and sends each entered line as a chat message. The
//! session reconnects on its own with exponential backoff.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin agora-client -- --username alice
//! cargo run --bin agora-client -- -n bob -u ws://127.0.0.1:8080/ws
//! ```

use clap::Parser;

use agora_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "agora-client")]
#[command(about = "Real-time chat client with presence and typing indicators", long_about = None)]
struct Args {
    /// Display name announced to the channel
    #[arg(short = 'n', long)]
    username: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = agora_client::cli::run_client(args.url, args.username).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
