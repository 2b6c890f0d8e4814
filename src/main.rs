use anyhow::Result;
use tracing_subscriber::EnvFilter;

use taxintegrity::openai::OpenAiClient;
use taxintegrity::qa::QaService;
use taxintegrity::store::SourceStore;
use taxintegrity::{run_server, AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();

    let openai = OpenAiClient::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
    );
    let store = SourceStore::new(
        openai.clone(),
        config.store_name.clone(),
        config.site_dir.clone(),
    );
    let qa = QaService::new(openai, store, config.models.clone());

    run_server(config, qa).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
