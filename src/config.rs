use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub answer_model: String,
    pub fallback_model: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub site_dir: PathBuf,
    pub store_name: String,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub models: ModelConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let site_dir = env::var("TAXINTEGRITY_SITE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./site"));

        Self {
            bind_addr: env::var("TAXINTEGRITY_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            site_dir,
            store_name: env::var("TAXINTEGRITY_STORE_NAME")
                .unwrap_or_else(|_| "Tax Evasion Data Base".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            // Absence is not a startup error; the first remote call reports it.
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            models: ModelConfig {
                answer_model: env::var("ANSWER_MODEL")
                    .unwrap_or_else(|_| "gpt-4-turbo".to_string()),
                fallback_model: env::var("FALLBACK_MODEL")
                    .unwrap_or_else(|_| "gpt-4".to_string()),
            },
        }
    }

    pub fn spa_dist_dir(&self) -> PathBuf {
        self.site_dir.join("taxintegrity-ai").join("dist")
    }
}
