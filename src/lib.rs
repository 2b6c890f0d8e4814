pub mod config;
pub mod models;
pub mod openai;
pub mod qa;
pub mod server;
pub mod sources;
pub mod store;

pub use config::AppConfig;
pub use server::run_server;
