use log::error;
use timetable_search::server;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = server::bind_addr();
    if let Err(e) = server::run_server(&addr).await {
        error!("Server on {addr} stopped: {e}");
        std::process::exit(1);
    }
}
