#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ticketwatch_daemon::run().await
}
