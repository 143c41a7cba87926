use practicum_portal_backend::error::AppError;
use practicum_portal_backend::telemetry::setup_tracing;
use practicum_portal_backend::{run_server, setup_server};
use practicum_portal_config::get_config;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_tracing();

    let result = async {
        let config = get_config()?;
        let state = setup_server(config).await?;
        run_server(state).await
    }
    .await;
    if let Err(err) = &result {
        error!("server stopped: {err}");
    }
    result
}
