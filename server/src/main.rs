use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Also accept clients on this Unix domain socket
    #[arg(short, long)]
    unix_socket: Option<PathBuf>,

    /// Serve GET /matches on this port
    #[arg(short, long)]
    inspect_port: Option<u16>,

    /// Disconnect clients that stay silent this many seconds before logging
    /// in or while it is their turn to guess (0 disables)
    #[arg(long, default_value = "300")]
    idle_timeout_secs: u64,

    /// Password every client must present
    #[arg(long, env = "WORD_DUEL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        tcp_addr: format!("{}:{}", args.host, args.port),
        unix_socket: args.unix_socket,
        inspect_addr: args
            .inspect_port
            .map(|port| format!("{}:{}", args.host, port)),
        password: args.password,
        idle_timeout: (args.idle_timeout_secs > 0)
            .then(|| Duration::from_secs(args.idle_timeout_secs)),
    };

    info!("Starting word duel server...");
    let server = Server::bind(config).await?;
    let handle = server.handle();
    let mut server_task = tokio::spawn(server.run());

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => info!("Server stopped"),
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
            }
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    handle.shutdown();
    server_task.await??;

    Ok(())
}
