use mock_server::Settings;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let mut settings = Settings::default();
    if let Some(size) = std::env::var("PAGE_SIZE").ok().and_then(|s| s.parse().ok()) {
        settings.page_size = size;
    }
    settings.token = std::env::var("MOCK_TOKEN").ok();

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("listening on {addr}");
    mock_server::run_with(listener, settings).await
}
