// src/main.rs
use std::sync::Arc;

use pallet_optimizer::api;
use pallet_optimizer::config::AppConfig;
use pallet_optimizer::logging;
use pallet_optimizer::service::PalletOptimizerService;
use pallet_optimizer::store::{InMemoryRepository, JsonFileRepository, PalletRepository};

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();
    logging::init();
    if let Err(err) = dotenv_result
        && !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        tracing::warn!("Could not load .env: {}", err);
    }

    let app_config = AppConfig::from_env();

    let repository: Arc<dyn PalletRepository> = match app_config.storage.data_file() {
        Some(path) => match JsonFileRepository::open(path) {
            Ok(repository) => Arc::new(repository),
            Err(err) => {
                tracing::error!(path = %path.display(), "Could not open data file: {}", err);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("No data file configured, keeping catalog in memory");
            Arc::new(InMemoryRepository::new())
        }
    };

    let service = PalletOptimizerService::new(repository, app_config.optimizer.options());

    tracing::info!("Pallet optimizer starting");
    if let Err(err) = api::start_api_server(app_config.api, service).await {
        tracing::error!("API server terminated with an error: {}", err);
        std::process::exit(1);
    }
}
