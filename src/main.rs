#[tokio::main]
async fn main() {
    if let Err(e) = manhwa_rush_lib::start_server().await {
        log::error!("{}", e);
        eprintln!("manhwa-rush: {e}");
        std::process::exit(1);
    }
}
