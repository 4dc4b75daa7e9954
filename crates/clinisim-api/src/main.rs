use tracing_subscriber::EnvFilter;

use clinisim_api::config::Settings;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Structured JSON logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let settings = Settings::from_env()?;
    let state = clinisim_api::build_state(&settings).await?;
    let app = clinisim_api::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    tracing::info!(bind = %settings.bind, model = %settings.llm_model, "clinisim listening");
    axum::serve(listener, app).await?;
    Ok(())
}
