use std::process;

#[tokio::main]
async fn main() {
    if let Err(e) = chinwag::cli::main().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
