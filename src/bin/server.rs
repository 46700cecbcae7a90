//! Server entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    capsa_anchor::server::run().await
}
