use clap::Parser;
use server::network::Server;
use shared::GameConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Artificial one-way lag added to outgoing packets (ms)
    #[clap(short, long, default_value = "0")]
    lag: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, GameConfig::default(), args.lag).await?;
    server.run().await
}
