use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    bruceflash::cli::run().await
}
