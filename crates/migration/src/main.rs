use config::Config;
use sea_orm_migration::prelude::*;
use std::env;

/// Config file consulted when `DATABASE_URL` is unset. Overridable through
/// `LTI_PROVIDER_CONFIG`.
const DEFAULT_CONFIG: &str = "config.yaml";

#[tokio::main]
async fn main() {
    if env::var("DATABASE_URL").is_err() {
        let path = env::var("LTI_PROVIDER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.into());
        let settings = Config::builder()
            .add_source(config::File::with_name(&path))
            .build()
            .unwrap_or_else(|e| panic!("Failed to read {path}: {e}"));
        if let Ok(url) = settings.get_string("database_url") {
            env::set_var("DATABASE_URL", url);
        }
    }
    cli::run_cli(migration::Migrator).await;
}
