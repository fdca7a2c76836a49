#[tokio::main]
async fn main() -> anyhow::Result<()> {
    admitrag_server::start().await
}
