use config::Config;
use sea_orm_migration::prelude::*;
use std::env;

#[tokio::main]
async fn main() {
    // The sea-orm CLI reads DATABASE_URL; when it is absent, borrow the
    // connection string from the gateway's config.yaml so both binaries
    // point at the same database.
    if env::var("DATABASE_URL").is_err() {
        let settings = Config::builder()
            .add_source(config::File::with_name("config.yaml"))
            .build()
            .expect("DATABASE_URL is unset and config.yaml could not be read");
        if let Ok(url) = settings.get_string("database_url") {
            env::set_var("DATABASE_URL", url);
        }
    }
    cli::run_cli(migration::Migrator).await;
}
