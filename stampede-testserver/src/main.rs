use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;

/// Local ticket API for exercising stampede by hand.
///
/// Prints `BASE_URL=<url>` to stdout once it accepts connections.
#[derive(Debug, Parser)]
#[command(name = "stampede-testserver", version)]
struct Args {
    /// Address to listen on; port 0 picks a free port
    #[arg(long, default_value = "127.0.0.1:0")]
    bind: SocketAddr,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let listener = TcpListener::bind(args.bind).await?;
    let addr = listener.local_addr()?;
    let app = stampede_testserver::router(stampede_testserver::TestServerStats::default());

    println!("BASE_URL=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
