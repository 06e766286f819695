use auto_backend::config::AppConfig;
use auto_backend::run_server;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_server(config).await {
        log::error!("Server terminated with error: {}", e);
        std::process::exit(1);
    }
}
