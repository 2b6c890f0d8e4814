use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use taxintegrity::config::AppConfig;
use taxintegrity::openai::OpenAiClient;
use taxintegrity::qa::QaService;
use taxintegrity::store::SourceStore;

#[derive(Parser, Debug)]
#[command(name = "ask")]
#[command(about = "Ask a single question against the uploaded tax PDF sources")]
struct Cli {
    #[arg(default_value = "Is AI really necessary when it comes to managing citizen's taxes?")]
    query: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

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

    let result = qa.answer(&cli.query).await?;

    println!("Query: {}", cli.query);
    println!("\nAnswer:\n{}", result.answer);
    println!("\n({} sources used)", result.sources_used);

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
