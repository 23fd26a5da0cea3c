#[tokio::main]
async fn main() {
    if let Err(e) = salesdesk::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
