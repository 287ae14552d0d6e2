use clap::Parser;
use client::network;
use log::info;
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    let stream = network::connect(&args.server).await?;
    let stdin = BufReader::new(tokio::io::stdin());
    network::drive(stream, stdin, &mut tokio::io::stdout()).await?;

    info!("Session ended");
    Ok(())
}
