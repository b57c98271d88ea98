use std::sync::Arc;

use spa_assets::config::Config;
use spa_assets::server::{self, ConnectionSettings};
use spa_assets::{logger, new_asset_handler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Worker count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let handler = Arc::new(new_asset_handler(
        cfg.assets_path(),
        &cfg.assets.build_commit,
    ));
    let settings = Arc::new(ConnectionSettings::from_config(&cfg));

    logger::log_server_start(&addr, &cfg);
    server::run(listener, handler, settings, server::shutdown_signal()).await;
    Ok(())
}
