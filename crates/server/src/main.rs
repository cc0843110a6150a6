use std::sync::Arc;

use rustls::crypto;
use rustls::crypto::CryptoProvider;
use safemore_auth::AppResources;
use safemore_auth::api::start_webserver;
use safemore_auth::config::load_config_or_panic;
use safemore_auth::cors::CorsPolicy;
use safemore_auth::delivery;
use safemore_auth::issuer::{HttpIssuer, IssuerHandle, IssuerOptions};
use safemore_auth::provision::{SeaOrmUserStore, SubjectMinter};
use sea_orm::Database;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "safemore_auth=info,hyper=warn,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install().expect("Failed to install `color_eyre::install`");

    initialize_tracing();

    // Load config
    let config = Arc::new(load_config_or_panic());

    let ring_provider = crypto::ring::default_provider();
    CryptoProvider::install_default(ring_provider).expect("Failed to install crypto provider");

    // Set up SeaORM database connection
    let db = Arc::new(
        Database::connect(&config.database_url)
            .await
            .expect("Failed to connect to database"),
    );

    let policy = CorsPolicy::from_config(&config.cors)?;

    // The issuer integration owns the provisioning side: codes go out
    // through the configured channel, logins mint subjects via the store.
    let code_sender = delivery::from_config(&config)?;
    let minter = SubjectMinter::new(Arc::new(SeaOrmUserStore::new(db)));
    let options = IssuerOptions::new(config.theme.clone(), code_sender, minter);
    let issuer: IssuerHandle = Arc::new(HttpIssuer::from_config(&config.issuer, options)?);
    tracing::info!(
        upstream = %config.issuer.upstream_url,
        allow_origin = %config.cors.allow_origin,
        code_delivery = ?config.code_delivery,
        "Issuer delegation configured"
    );

    let resources = AppResources { config };
    start_webserver(resources, issuer, policy).await?;
    Ok(())
}
