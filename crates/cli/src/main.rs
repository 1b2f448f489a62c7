mod commands;
mod config;
mod error;

use std::sync::Arc;

use twigs_core::{FileCredentials, Services};

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let (settings, command) = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "twigs={level},twigs_core={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let mut builder = Services::builder().base_url(&settings.base_url);
    if !settings.cache {
        builder = builder.without_cache();
    }
    let services = builder.build()?;

    let credentials = Arc::new(FileCredentials::load(&settings.credentials_path)?);
    tracing::debug!("using credentials at {}", credentials.path().display());
    let session = services.session(credentials);

    commands::run(&services, &session, &settings, command).await
}
