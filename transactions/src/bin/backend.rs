use std::error::Error;
use std::sync::Arc;

use transactions::codec::FileRecordCodec;
use transactions::executable_utils::{
    initialize_executable, initialize_tracing, run_backend, AppState,
};
use transactions::storage::PgTransactionStore;
use transactions::timezone::TimeApiResolver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);

    let store = PgTransactionStore::new(&config.common.database_url).await?;
    let resolver = TimeApiResolver::new(&config.time_zone_api.base_url)?;

    let state = AppState::new(
        Arc::new(FileRecordCodec),
        Arc::new(store),
        Arc::new(resolver),
    );

    run_backend(config.backend, state).await
}
