#[tokio::main]
async fn main() {
    if let Err(err) = bs_api::run().await {
        tracing::error!(error = %err, "bs-api failed");
        eprintln!("bs-api: {err}");
        std::process::exit(1);
    }
}
